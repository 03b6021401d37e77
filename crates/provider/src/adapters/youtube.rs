use chrono::{DateTime, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::{map_status, map_transport_error};
use crate::payload::{RawPayload, YoutubeRaw, YoutubeVideo};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

const MAX_VIDEOS: usize = 50;

/// Video adapter: paginates the channel's uploads playlist via
/// `playlistItems.list`.
pub struct YoutubeProvider {
    client: Client,
    base_url: String,
    uploads_playlist_id: String,
}

impl YoutubeProvider {
    #[must_use]
    pub fn new(client: Client, uploads_playlist_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: "https://www.googleapis.com/youtube/v3".into(),
            uploads_playlist_id: uploads_playlist_id.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(client: Client, uploads_playlist_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), uploads_playlist_id: uploads_playlist_id.into() }
    }
}

impl Provider for YoutubeProvider {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/playlistItems?part=snippet&maxResults=50&playlistId={}",
                self.base_url, self.uploads_playlist_id
            );
            if let Some(pt) = &page_token {
                url.push_str(&format!("&pageToken={pt}"));
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

            let items = parsed.get("items").and_then(|v| v.as_array()).ok_or_else(|| TimelineError::ParseError("missing items array".into()))?;
            for item in items {
                if videos.len() >= MAX_VIDEOS {
                    break;
                }
                videos.push(parse_video(item)?);
            }

            page_token = parsed.get("nextPageToken").and_then(|v| v.as_str()).map(String::from);
            if page_token.is_none() || videos.len() >= MAX_VIDEOS {
                break;
            }
        }

        Ok(FetchEnvelope { payload: RawPayload::Youtube(YoutubeRaw { videos }), rate_limit: RateLimitInfo::default() })
    }
}

fn parse_video(item: &serde_json::Value) -> Result<YoutubeVideo, TimelineError> {
    let snippet = item.get("snippet").ok_or_else(|| TimelineError::ParseError("missing snippet".into()))?;
    let video_id = snippet
        .get("resourceId")
        .and_then(|r| r.get("videoId"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| TimelineError::ParseError("missing resourceId.videoId".into()))?;
    let title = snippet.get("title").and_then(|v| v.as_str()).unwrap_or_default();
    let published_at_str = snippet
        .get("publishedAt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TimelineError::ParseError("missing publishedAt".into()))?;
    let published_at = DateTime::parse_from_rfc3339(published_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimelineError::ParseError(format!("bad timestamp: {e}")))?;
    let channel_title = snippet.get("channelTitle").and_then(|v| v.as_str()).unwrap_or_default();
    let thumbnail_url = snippet
        .get("thumbnails")
        .and_then(|t| t.get("maxres").or_else(|| t.get("high")).or_else(|| t.get("default")))
        .and_then(|t| t.get("url"))
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(YoutubeVideo {
        video_id: video_id.to_string(),
        title: title.to_string(),
        published_at,
        channel_title: channel_title.to_string(),
        thumbnail_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_highest_available_thumbnail() {
        let item = serde_json::json!({
            "snippet": {
                "resourceId": {"videoId": "abc123"},
                "title": "My Video",
                "publishedAt": "2024-01-15T10:00:00Z",
                "channelTitle": "My Channel",
                "thumbnails": {"default": {"url": "low.jpg"}, "high": {"url": "hi.jpg"}}
            }
        });
        let video = parse_video(&item).unwrap();
        assert_eq!(video.thumbnail_url, Some("hi.jpg".to_string()));
    }
}
