use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::{map_status, map_transport_error};
use crate::payload::{RawPayload, RedditComment, RedditMeta, RedditRaw, RedditSubmission};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

/// Link-aggregator adapter. Fetches submitted posts and comments; also
/// maintains a `meta` payload (karma, active subreddits) written to the
/// sibling store-id `raw/reddit/{account_id}/meta`, not consumed by the
/// timeline materializer.
pub struct RedditProvider {
    client: Client,
    base_url: String,
    username: String,
}

impl RedditProvider {
    #[must_use]
    pub fn new(client: Client, username: impl Into<String>) -> Self {
        Self { client, base_url: "https://oauth.reddit.com".into(), username: username.into() }
    }

    #[must_use]
    pub fn with_base_url(client: Client, username: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), username: username.into() }
    }

    async fn get_listing(&self, token: &str, path: &str) -> Result<serde_json::Value, TimelineError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("User-Agent", "timeline-pipeline/0.1")
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error(&e))?;
        map_status(status, &body)?;
        serde_json::from_str(&body).map_err(|e| TimelineError::ParseError(e.to_string()))
    }

    /// Fetches the auxiliary meta payload separately from the main
    /// `fetch` call, since it is written to its own store-id.
    pub async fn fetch_meta(&self, token: &str) -> Result<RedditMeta, TimelineError> {
        let about = self.get_listing(token, &format!("/user/{}/about", self.username)).await?;
        let data = about.get("data").ok_or_else(|| TimelineError::ParseError("missing about data".into()))?;
        let karma = data.get("link_karma").and_then(|v| v.as_i64()).unwrap_or(0)
            + data.get("comment_karma").and_then(|v| v.as_i64()).unwrap_or(0);

        let submitted = self.get_listing(token, &format!("/user/{}/submitted", self.username)).await?;
        let mut subreddits: Vec<String> = children(&submitted)?
            .iter()
            .filter_map(|c| c.get("data")?.get("subreddit")?.as_str().map(String::from))
            .collect();
        subreddits.sort();
        subreddits.dedup();

        Ok(RedditMeta { karma, active_subreddits: subreddits })
    }
}

fn children(listing: &serde_json::Value) -> Result<&Vec<serde_json::Value>, TimelineError> {
    listing
        .get("data")
        .and_then(|d| d.get("children"))
        .and_then(|c| c.as_array())
        .ok_or_else(|| TimelineError::ParseError("listing missing data.children".into()))
}

fn epoch_seconds_to_datetime(secs: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs as i64, 0).single().unwrap_or_else(Utc::now)
}

impl Provider for RedditProvider {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let submitted = self.get_listing(token, &format!("/user/{}/submitted", self.username)).await?;
        let submissions = children(&submitted)?
            .iter()
            .map(|c| {
                let data = c.get("data").ok_or_else(|| TimelineError::ParseError("submission missing data".into()))?;
                Ok(RedditSubmission {
                    id: data.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    subreddit: data.get("subreddit").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    title: data.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    created_utc: epoch_seconds_to_datetime(data.get("created_utc").and_then(|v| v.as_f64()).unwrap_or(0.0)),
                    permalink: data.get("permalink").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                })
            })
            .collect::<Result<Vec<_>, TimelineError>>()?;

        let comments_listing = self.get_listing(token, &format!("/user/{}/comments", self.username)).await?;
        let comments = children(&comments_listing)?
            .iter()
            .map(|c| {
                let data = c.get("data").ok_or_else(|| TimelineError::ParseError("comment missing data".into()))?;
                Ok(RedditComment {
                    id: data.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    subreddit: data.get("subreddit").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    body: data.get("body").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    created_utc: epoch_seconds_to_datetime(data.get("created_utc").and_then(|v| v.as_f64()).unwrap_or(0.0)),
                    permalink: data.get("permalink").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    parent_id: data.get("parent_id").and_then(|v| v.as_str()).map(String::from),
                })
            })
            .collect::<Result<Vec<_>, TimelineError>>()?;

        Ok(FetchEnvelope { payload: RawPayload::Reddit(RedditRaw { submissions, comments }), rate_limit: RateLimitInfo::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_seconds_round_trip() {
        let dt = epoch_seconds_to_datetime(1_705_312_800.0);
        assert_eq!(dt.timestamp(), 1_705_312_800);
    }
}
