use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::{map_status, map_transport_error, retry_after_secs};
use crate::payload::{GithubCommit, GithubPullRequest, GithubPullRequestState, GithubRaw, GithubRepoActivity, RawPayload};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

const MAX_EVENTS: usize = 100;
const MAX_COMMITS_PER_REPO: usize = 100;

/// Code-host adapter: paginates the authenticated user's push events,
/// then per repo fetches commits and pull requests.
pub struct GithubProvider {
    client: Client,
    base_url: String,
    /// Rate-limit budget observed on the most recent response, reported
    /// back to the scheduler alongside a successful `fetch`.
    last_rate_limit: Mutex<RateLimitInfo>,
}

impl GithubProvider {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client, base_url: "https://api.github.com".into(), last_rate_limit: Mutex::new(RateLimitInfo::default()) }
    }

    /// Test/staging hook: point at a mock server instead of the real API.
    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), last_rate_limit: Mutex::new(RateLimitInfo::default()) }
    }

    async fn get_json(&self, token: &str, path: &str) -> Result<serde_json::Value, TimelineError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "timeline-pipeline")
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let rate_limit = extract_rate_limit(response.headers());
        *self.last_rate_limit.lock().unwrap() = rate_limit;

        if response.status().as_u16() == 429 {
            let retry_after = retry_after_secs(response.headers(), 60);
            return Err(TimelineError::RateLimited { retry_after: std::time::Duration::from_secs(retry_after as u64) });
        }
        if rate_limit.remaining == Some(0) {
            let retry_after = retry_after_secs(response.headers(), 3600);
            return Err(TimelineError::RateLimited { retry_after: std::time::Duration::from_secs(retry_after as u64) });
        }

        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error(&e))?;
        map_status(status, &body)?;
        serde_json::from_str(&body).map_err(|e| TimelineError::ParseError(e.to_string()))
    }
}

/// Reads `X-RateLimit-Remaining`/`-Limit`/`-Reset` (the last a Unix
/// timestamp in seconds), so a successful fetch can report the live
/// budget back to the rate-limit gate.
fn extract_rate_limit(headers: &reqwest::header::HeaderMap) -> RateLimitInfo {
    let header_u32 = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).and_then(|s| s.parse::<u32>().ok());
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    RateLimitInfo { remaining: header_u32("x-ratelimit-remaining"), limit_total: header_u32("x-ratelimit-limit"), reset_at }
}

impl Provider for GithubProvider {
    fn platform(&self) -> Platform {
        Platform::Github
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let user = self.get_json(token, "/user").await?;
        let username = user
            .get("login")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TimelineError::ParseError("missing login in /user response".into()))?
            .to_string();

        let events = self
            .get_json(token, &format!("/users/{username}/events?per_page={MAX_EVENTS}"))
            .await?;
        let events = events.as_array().ok_or_else(|| TimelineError::ParseError("events response was not an array".into()))?;

        let mut repo_names: Vec<String> = events
            .iter()
            .filter(|e| e.get("type").and_then(|t| t.as_str()) == Some("PushEvent"))
            .filter_map(|e| e.get("repo")?.get("name")?.as_str().map(String::from))
            .collect();
        repo_names.sort();
        repo_names.dedup();

        let mut repos = HashMap::new();
        for repo in repo_names {
            let commits = self.fetch_repo_commits(token, &repo, &username).await?;
            let pull_requests = self.fetch_repo_pull_requests(token, &repo).await?;
            repos.insert(repo, GithubRepoActivity { commits, pull_requests });
        }

        let rate_limit = *self.last_rate_limit.lock().unwrap();
        Ok(FetchEnvelope { payload: RawPayload::Github(GithubRaw { username, repos }), rate_limit })
    }
}

impl GithubProvider {
    async fn fetch_repo_commits(&self, token: &str, repo: &str, author: &str) -> Result<Vec<GithubCommit>, TimelineError> {
        let path = format!("/repos/{repo}/commits?author={author}&per_page={MAX_COMMITS_PER_REPO}");
        let commits = self.get_json(token, &path).await?;
        let commits = commits.as_array().ok_or_else(|| TimelineError::ParseError("commits response was not an array".into()))?;

        commits
            .iter()
            .map(|c| {
                let sha = c.get("sha").and_then(|v| v.as_str()).ok_or_else(|| TimelineError::ParseError("missing sha".into()))?;
                let commit = c.get("commit").ok_or_else(|| TimelineError::ParseError("missing commit".into()))?;
                let message = commit.get("message").and_then(|v| v.as_str()).unwrap_or_default();
                let timestamp_str = commit
                    .get("author")
                    .and_then(|a| a.get("date"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| TimelineError::ParseError("missing commit author date".into()))?;
                let timestamp = parse_timestamp(timestamp_str)?;
                let stats = c.get("stats");
                Ok(GithubCommit {
                    sha: sha.to_string(),
                    message: message.to_string(),
                    timestamp,
                    branch: "main".to_string(),
                    additions: stats.and_then(|s| s.get("additions")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    deletions: stats.and_then(|s| s.get("deletions")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    files_changed: c.get("files").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0) as u32,
                })
            })
            .collect()
    }

    async fn fetch_repo_pull_requests(&self, token: &str, repo: &str) -> Result<Vec<GithubPullRequest>, TimelineError> {
        let path = format!("/repos/{repo}/pulls?state=all&per_page={MAX_COMMITS_PER_REPO}");
        let pulls = self.get_json(token, &path).await?;
        let pulls = pulls.as_array().ok_or_else(|| TimelineError::ParseError("pulls response was not an array".into()))?;

        let mut result = Vec::with_capacity(pulls.len());
        for p in pulls {
            let number = p.get("number").and_then(|v| v.as_u64()).ok_or_else(|| TimelineError::ParseError("missing pr number".into()))?;
            let title = p.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let merged = p.get("merged_at").and_then(|v| v.as_str()).is_some();
            let state = if merged {
                GithubPullRequestState::Merged
            } else if p.get("state").and_then(|v| v.as_str()) == Some("closed") {
                GithubPullRequestState::Closed
            } else {
                GithubPullRequestState::Open
            };
            let updated_at_str = p.get("updated_at").and_then(|v| v.as_str()).ok_or_else(|| TimelineError::ParseError("missing updated_at".into()))?;
            let updated_at = parse_timestamp(updated_at_str)?;
            let url = p.get("html_url").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            // Fetched one PR at a time rather than fanned out: GitHub's own
            // rate limit makes unbounded concurrency here counterproductive,
            // and this loop already sits inside a per-repo loop.
            let commit_shas = self.fetch_pr_commit_shas(token, repo, number).await?;
            result.push(GithubPullRequest { number, title, state, commit_shas, updated_at, url });
        }
        Ok(result)
    }

    async fn fetch_pr_commit_shas(&self, token: &str, repo: &str, number: u64) -> Result<Vec<String>, TimelineError> {
        let path = format!("/repos/{repo}/pulls/{number}/commits");
        let commits = self.get_json(token, &path).await?;
        let commits = commits.as_array().ok_or_else(|| TimelineError::ParseError("pr commits response was not an array".into()))?;
        Ok(commits.iter().filter_map(|c| c.get("sha").and_then(|v| v.as_str()).map(String::from)).collect())
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimelineError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimelineError::ParseError(format!("bad timestamp {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    #[test]
    fn parses_rfc3339_timestamps() {
        assert!(parse_timestamp("2024-01-15T10:00:00Z").is_ok());
        assert!(parse_timestamp("not-a-date").is_err());
    }

    #[test]
    fn extracts_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "4999".parse().unwrap());
        headers.insert("x-ratelimit-limit", "5000".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1705312800".parse().unwrap());
        let info = extract_rate_limit(&headers);
        assert_eq!(info.remaining, Some(4999));
        assert_eq!(info.limit_total, Some(5000));
        assert_eq!(info.reset_at.unwrap().timestamp(), 1_705_312_800);
    }

    #[test]
    fn missing_rate_limit_headers_yield_none() {
        let info = extract_rate_limit(&HeaderMap::new());
        assert_eq!(info, RateLimitInfo::default());
    }
}
