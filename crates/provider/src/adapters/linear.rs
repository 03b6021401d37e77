use chrono::{DateTime, Utc};
use reqwest::Client;
use timeline_core::{Platform, TimelineError};

use crate::http::map_transport_error;
use crate::payload::{LinearIssue, LinearRaw, RawPayload};
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

const ISSUES_QUERY: &str = r"
query AssignedOrAuthoredIssues {
  issues(filter: { or: [{ assignee: { isMe: { eq: true } } }, { creator: { isMe: { eq: true } } }] }, first: 100) {
    nodes {
      id
      identifier
      title
      updatedAt
      url
      state { name }
      team { name }
    }
  }
}
";

/// Task tracker adapter: fetches assigned or authored issues over
/// Linear's GraphQL API.
pub struct LinearProvider {
    client: Client,
    base_url: String,
}

impl LinearProvider {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client, base_url: "https://api.linear.app/graphql".into() }
    }

    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

impl Provider for LinearProvider {
    fn platform(&self) -> Platform {
        Platform::Linear
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "query": ISSUES_QUERY }))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| map_transport_error(&e))?;
        if status.as_u16() == 401 {
            return Err(TimelineError::AuthExpired);
        }
        if !status.is_success() {
            return Err(TimelineError::ApiError { status: status.as_u16(), msg: body.chars().take(200).collect() });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body).map_err(|e| TimelineError::ParseError(e.to_string()))?;
        if let Some(errors) = parsed.get("errors").and_then(|v| v.as_array()) {
            if !errors.is_empty() {
                let msg = errors[0].get("message").and_then(|v| v.as_str()).unwrap_or("graphql error");
                return Err(TimelineError::ApiError { status: status.as_u16(), msg: msg.to_string() });
            }
        }

        let nodes = parsed
            .get("data")
            .and_then(|d| d.get("issues"))
            .and_then(|i| i.get("nodes"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| TimelineError::ParseError("missing data.issues.nodes".into()))?;

        let issues = nodes
            .iter()
            .map(|n| {
                let updated_at_str = n.get("updatedAt").and_then(|v| v.as_str()).ok_or_else(|| TimelineError::ParseError("missing updatedAt".into()))?;
                let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(updated_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| TimelineError::ParseError(format!("bad timestamp: {e}")))?;
                Ok(LinearIssue {
                    id: n.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    identifier: n.get("identifier").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    title: n.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    team: n.get("team").and_then(|t| t.get("name")).and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    status: n.get("state").and_then(|s| s.get("name")).and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    updated_at,
                    url: n.get("url").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                })
            })
            .collect::<Result<Vec<_>, TimelineError>>()?;

        Ok(FetchEnvelope { payload: RawPayload::Linear(LinearRaw { issues }), rate_limit: RateLimitInfo::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_mentions_both_assignee_and_creator() {
        assert!(ISSUES_QUERY.contains("assignee"));
        assert!(ISSUES_QUERY.contains("creator"));
    }
}
