use std::time::Duration;

use thiserror::Error;

/// The error taxonomy shared by every layer of the pipeline, from
/// provider adapters up through the HTTP read surface.
///
/// Each variant names the recovery behavior it implies; callers match on
/// variant, not on message text.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("auth expired")]
    AuthExpired,

    #[error("network error: {cause}")]
    NetworkError { cause: String },

    #[error("provider returned {status}: {msg}")]
    ApiError { status: u16, msg: String },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("store error during {operation}")]
    StoreError { operation: String },

    #[error("encryption error during {op}")]
    EncryptionError { op: EncryptionOp },

    #[error("conflict")]
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionOp {
    Encrypt,
    Decrypt,
}

impl std::fmt::Display for EncryptionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncryptionOp::Encrypt => write!(f, "encrypt"),
            EncryptionOp::Decrypt => write!(f, "decrypt"),
        }
    }
}

impl TimelineError {
    /// True for provider-facing failures that should feed into the
    /// rate-limit gate's failure streak rather than being treated as a
    /// one-off.
    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            TimelineError::NetworkError { .. }
                | TimelineError::ApiError { .. }
                | TimelineError::ParseError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failure_classification() {
        assert!(TimelineError::NetworkError { cause: "x".into() }.is_provider_failure());
        assert!(TimelineError::ApiError { status: 500, msg: "x".into() }.is_provider_failure());
        assert!(TimelineError::ParseError("x".into()).is_provider_failure());
        assert!(!TimelineError::AuthExpired.is_provider_failure());
        assert!(!TimelineError::NotFound.is_provider_failure());
    }

    #[test]
    fn display_includes_retry_after() {
        let err = TimelineError::RateLimited { retry_after: Duration::from_secs(120) };
        assert!(err.to_string().contains("120"));
    }
}
