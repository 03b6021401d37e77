use chrono::{DateTime, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::{map_status, map_transport_error};
use crate::payload::{RawPayload, Tweet, TwitterRaw};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

const MAX_TWEETS: usize = 100;

/// Micro-blogging adapter: recent author tweets with public metrics.
pub struct TwitterProvider {
    client: Client,
    base_url: String,
    user_id: String,
}

impl TwitterProvider {
    #[must_use]
    pub fn new(client: Client, user_id: impl Into<String>) -> Self {
        Self { client, base_url: "https://api.twitter.com/2".into(), user_id: user_id.into() }
    }

    #[must_use]
    pub fn with_base_url(client: Client, user_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), user_id: user_id.into() }
    }
}

impl Provider for TwitterProvider {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let mut tweets = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/users/{}/tweets?max_results=100&tweet.fields=created_at,public_metrics,author_id",
                self.base_url, self.user_id
            );
            if let Some(pt) = &pagination_token {
                url.push_str(&format!("&pagination_token={pt}"));
            }
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| map_transport_error(&e))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| map_transport_error(&e))?;
            map_status(status, &body)?;
            let parsed: serde_json::Value = serde_json::from_str(&body).map_err(|e| TimelineError::ParseError(e.to_string()))?;

            let data = parsed.get("data").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for entry in &data {
                if tweets.len() >= MAX_TWEETS {
                    break;
                }
                tweets.push(parse_tweet(entry)?);
            }

            pagination_token = parsed
                .get("meta")
                .and_then(|m| m.get("next_token"))
                .and_then(|v| v.as_str())
                .map(String::from);
            if pagination_token.is_none() || tweets.len() >= MAX_TWEETS {
                break;
            }
        }

        Ok(FetchEnvelope { payload: RawPayload::Twitter(TwitterRaw { tweets }), rate_limit: RateLimitInfo::default() })
    }
}

fn parse_tweet(entry: &serde_json::Value) -> Result<Tweet, TimelineError> {
    let id = entry.get("id").and_then(|v| v.as_str()).ok_or_else(|| TimelineError::ParseError("missing tweet id".into()))?;
    let text = entry.get("text").and_then(|v| v.as_str()).unwrap_or_default();
    let created_at_str = entry
        .get("created_at")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TimelineError::ParseError("missing created_at".into()))?;
    let created_at = DateTime::parse_from_rfc3339(created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimelineError::ParseError(format!("bad timestamp: {e}")))?;
    let metrics = entry.get("public_metrics");

    Ok(Tweet {
        id: id.to_string(),
        text: text.to_string(),
        created_at,
        author_handle: entry.get("author_id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        reply_count: metrics.and_then(|m| m.get("reply_count")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        retweet_count: metrics.and_then(|m| m.get("retweet_count")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        like_count: metrics.and_then(|m| m.get("like_count")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_public_metrics() {
        let entry = serde_json::json!({
            "id": "1",
            "text": "hello",
            "created_at": "2024-01-15T10:00:00Z",
            "author_id": "u1",
            "public_metrics": {"reply_count": 1, "retweet_count": 2, "like_count": 3}
        });
        let tweet = parse_tweet(&entry).unwrap();
        assert_eq!(tweet.like_count, 3);
    }
}
