use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use timeline_core::{ApiKey, UserId};

use crate::error::ApiError;
use crate::AppState;

/// The caller resolved from a bearer token, attached to the request via
/// [`axum::Extension`] for handlers to consult.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

/// Resolves the bearer token against the `api_keys` table (hash lookup)
/// and rejects the request with 403 if it is missing or unknown.
/// Updates the key's `last_used_at` on success.
pub async fn require_api_key(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let raw_key = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(timeline_core::TimelineError::Forbidden)?;

    let key_hash = ApiKey::hash_plaintext(raw_key);
    let api_key = state
        .metadata
        .find_api_key_by_hash(&key_hash)
        .await?
        .ok_or(timeline_core::TimelineError::Forbidden)?;

    state.metadata.touch_api_key_usage(api_key.id).await?;

    request.extensions_mut().insert(CallerIdentity { user_id: api_key.user_id });
    Ok(next.run(request).await)
}
