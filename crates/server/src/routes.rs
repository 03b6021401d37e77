use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::Extension;
use serde::Deserialize;
use timeline_core::{timeline_store_id, AccountId, Platform, ProfileId, TimelineError, TimelineSnapshot, UserId};
use timeline_oauth::CallbackRequest;

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct DateRangeQuery {
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
}

/// `GET /timeline/{user_id}` -- the caller's latest materialized
/// timeline, optionally bounded to `[from, to]`.
pub async fn get_timeline(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(user_id): Path<UserId>,
    Query(range): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != user_id {
        return Err(TimelineError::Forbidden.into());
    }

    let store_id = timeline_store_id(&user_id.to_string());
    let snapshot = state.snapshots.get_latest(&store_id).await?;
    let date_groups = serde_json::from_slice(&snapshot.data).map_err(|e| TimelineError::ParseError(e.to_string()))?;
    let timeline = TimelineSnapshot { meta: snapshot.meta, date_groups };

    let filtered = timeline.filter_date_range(range.from, range.to);
    Ok(axum::Json(serde_json::json!({
        "meta": timeline.meta,
        "date_groups": filtered,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RawSnapshotQuery {
    pub account_id: AccountId,
}

/// `GET /timeline/{user_id}/raw/{platform}?account_id={id}` -- the
/// latest raw provider payload for one of the caller's accounts.
pub async fn get_raw_snapshot(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((user_id, platform)): Path<(UserId, String)>,
    Query(query): Query<RawSnapshotQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != user_id {
        return Err(TimelineError::Forbidden.into());
    }
    let platform = Platform::from_str(&platform)?;

    let account = state.metadata.get_account(query.account_id).await?;
    if account.platform != platform {
        return Err(TimelineError::NotFound.into());
    }
    let owning_profile = state.metadata.get_profile(account.profile_id).await?;
    if owning_profile.user_id != user_id {
        return Err(TimelineError::Forbidden.into());
    }

    let snapshot = state.snapshots.get_latest(&account.raw_store_id()).await?;
    let data: serde_json::Value =
        serde_json::from_slice(&snapshot.data).map_err(|e| TimelineError::ParseError(e.to_string()))?;
    Ok(axum::Json(serde_json::json!({ "meta": snapshot.meta, "data": data })))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub profile_id: ProfileId,
}

/// `GET /oauth/{platform}/callback` -- not bearer-authenticated; the
/// state parameter carries the initiating user id. Redirects to
/// `FRONTEND_URL` with either a success flag or `?error={platform}_{code}`.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> impl IntoResponse {
    let Ok(platform) = Platform::from_str(&platform) else {
        return redirect_with_error(&state.config.frontend_url, &platform, "unknown_platform");
    };

    let client_config = match platform {
        Platform::Github => state.config.github.as_ref(),
        Platform::Bluesky => state.config.bluesky.as_ref(),
        Platform::Youtube => state.config.youtube.as_ref(),
        Platform::Reddit => state.config.reddit.as_ref(),
        Platform::Twitter => state.config.twitter.as_ref(),
        Platform::Linear => state.config.linear.as_ref(),
    };

    let redirect_uri = format!("{}/oauth/{platform}/callback", state.config.app_url);
    let request = CallbackRequest {
        platform,
        profile_id: query.profile_id,
        code: query.code.as_deref(),
        state: query.state.as_deref(),
        error: query.error.as_deref(),
        redirect_uri: &redirect_uri,
        required_state_extras: &[],
    };

    match timeline_oauth::complete_callback(&state.http, state.metadata.as_ref(), &state.encryptor, client_config, request)
        .await
    {
        Ok(_account) => Redirect::to(&format!("{}?connected={platform}", state.config.frontend_url)),
        Err(err) => redirect_with_error(&state.config.frontend_url, platform.as_str(), &err.tag()),
    }
}

fn redirect_with_error(frontend_url: &str, platform: &str, tag: &str) -> Redirect {
    Redirect::to(&format!("{frontend_url}?error={platform}_{tag}"))
}
