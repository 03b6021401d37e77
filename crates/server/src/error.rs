use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use timeline_core::TimelineError;

/// Maps [`TimelineError`] (§7's taxonomy) onto the HTTP status/JSON
/// shape this read surface returns. `not_found`/`forbidden`/`validation`
/// propagate as the matching 4xx; everything else collapses to 500
/// with an opaque message, per the propagation policy.
#[derive(Debug)]
pub struct ApiError(TimelineError);

impl From<TimelineError> for ApiError {
    fn from(err: TimelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match &self.0 {
            TimelineError::NotFound => (StatusCode::NOT_FOUND, "not found".to_owned(), None),
            TimelineError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_owned(), None),
            TimelineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            TimelineError::Conflict => (StatusCode::CONFLICT, "conflict".to_owned(), None),
            TimelineError::RateLimited { retry_after } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate limited".to_owned(), Some(retry_after.as_secs()))
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string(), None),
        };

        let body = if let Some(retry) = retry_after {
            serde_json::json!({ "error": message, "retry_after": retry })
        } else {
            serde_json::json!({ "error": message })
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(retry) = retry_after {
            response.headers_mut().insert(axum::http::header::RETRY_AFTER, retry.into());
        }
        response
    }
}
