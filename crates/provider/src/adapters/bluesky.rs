use chrono::{DateTime, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::{map_status, map_transport_error};
use crate::payload::{BlueskyPost, BlueskyRaw, RawPayload};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

const MAX_POSTS: usize = 50;

/// Short-form feed adapter: paginates `app.bsky.feed.getAuthorFeed` up
/// to `MAX_POSTS` items.
pub struct BlueskyProvider {
    client: Client,
    base_url: String,
}

impl BlueskyProvider {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client, base_url: "https://bsky.social/xrpc".into() }
    }

    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

impl Provider for BlueskyProvider {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = format!("{}/app.bsky.feed.getAuthorFeed?limit=100", self.base_url);
            if let Some(c) = &cursor {
                url.push_str(&format!("&cursor={c}"));
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

            let feed = parsed.get("feed").and_then(|v| v.as_array()).ok_or_else(|| TimelineError::ParseError("missing feed array".into()))?;
            for entry in feed {
                if posts.len() >= MAX_POSTS {
                    break;
                }
                posts.push(parse_post(entry)?);
            }

            cursor = parsed.get("cursor").and_then(|v| v.as_str()).map(String::from);
            if cursor.is_none() || posts.len() >= MAX_POSTS {
                break;
            }
        }

        Ok(FetchEnvelope { payload: RawPayload::Bluesky(BlueskyRaw { posts }), rate_limit: RateLimitInfo::default() })
    }
}

fn parse_post(entry: &serde_json::Value) -> Result<BlueskyPost, TimelineError> {
    let post = entry.get("post").ok_or_else(|| TimelineError::ParseError("feed entry missing post".into()))?;
    let uri = post.get("uri").and_then(|v| v.as_str()).ok_or_else(|| TimelineError::ParseError("missing uri".into()))?;
    let author_handle = post
        .get("author")
        .and_then(|a| a.get("handle"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let record = post.get("record");
    let text = record.and_then(|r| r.get("text")).and_then(|v| v.as_str()).unwrap_or_default();
    let created_at_str = record
        .and_then(|r| r.get("createdAt"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| TimelineError::ParseError("missing createdAt".into()))?;
    let created_at = DateTime::parse_from_rfc3339(created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimelineError::ParseError(format!("bad timestamp: {e}")))?;

    Ok(BlueskyPost {
        uri: uri.to_string(),
        text: text.to_string(),
        created_at,
        author_handle: author_handle.to_string(),
        reply_count: post.get("replyCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        repost_count: post.get("repostCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        like_count: post.get("likeCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    })
}
