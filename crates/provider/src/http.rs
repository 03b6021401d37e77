use timeline_core::TimelineError;

/// Maps a completed HTTP response's status to the shared error
/// taxonomy, or `Ok(())` for 2xx. Every adapter calls this before
/// attempting to parse a response body, so rate-limit/auth handling is
/// identical across platforms.
pub fn map_status(status: reqwest::StatusCode, body_excerpt: &str) -> Result<(), TimelineError> {
    if status.is_success() {
        return Ok(());
    }
    if status.as_u16() == 429 {
        return Err(TimelineError::RateLimited { retry_after: std::time::Duration::from_secs(60) });
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(TimelineError::AuthExpired);
    }
    Err(TimelineError::ApiError { status: status.as_u16(), msg: body_excerpt.chars().take(200).collect() })
}

/// Maps a transport-level `reqwest::Error` (one that never produced a
/// response) to the shared taxonomy.
pub fn map_transport_error(err: &reqwest::Error) -> TimelineError {
    TimelineError::NetworkError { cause: err.to_string() }
}

/// Extracts `Retry-After` (seconds form) from response headers, falling
/// back to `default_secs` when absent or unparseable.
pub fn retry_after_secs(headers: &reqwest::header::HeaderMap, default_secs: i64) -> i64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(default_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn success_status_maps_to_ok() {
        assert!(map_status(reqwest::StatusCode::OK, "").is_ok());
    }

    #[test]
    fn rate_limit_status_maps_to_rate_limited() {
        assert!(matches!(map_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""), Err(TimelineError::RateLimited { .. })));
    }

    #[test]
    fn unauthorized_maps_to_auth_expired() {
        assert!(matches!(map_status(reqwest::StatusCode::UNAUTHORIZED, ""), Err(TimelineError::AuthExpired)));
    }

    #[test]
    fn other_error_status_maps_to_api_error() {
        assert!(matches!(
            map_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            Err(TimelineError::ApiError { status: 500, .. })
        ));
    }

    #[test]
    fn retry_after_parses_header_or_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("42"));
        assert_eq!(retry_after_secs(&headers, 10), 42);
        assert_eq!(retry_after_secs(&HeaderMap::new(), 10), 10);
    }
}
