use thiserror::Error;

/// The OAuth callback's own failure taxonomy, distinct from
/// [`timeline_core::TimelineError`] because each variant also names the
/// tag appended to the front-end error redirect (`?error={tag}`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OAuthError {
    #[error("provider denied the authorization request")]
    AuthDenied,
    #[error("callback missing the authorization code")]
    NoCode,
    #[error("callback missing the state parameter")]
    NoState,
    #[error("state parameter was not valid base64")]
    InvalidBase64,
    #[error("state parameter was not valid JSON")]
    InvalidJson,
    #[error("state payload is missing user_id")]
    MissingUserId,
    #[error("state payload is missing required key `{0}`")]
    MissingExtra(String),
    #[error("state parameter failed validation")]
    InvalidState,
    #[error("no client configured for this platform")]
    NotConfigured,
    #[error("token exchange with the platform failed")]
    TokenFailed,
    #[error("fetching the platform identity failed")]
    UserFailed,
    #[error("persisting the linked account failed")]
    SaveFailed,
}

impl OAuthError {
    /// The redirect tag surfaced to the front end as `?error={tag}`.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            OAuthError::AuthDenied => "auth_denied".to_owned(),
            OAuthError::NoCode => "no_code".to_owned(),
            OAuthError::NoState => "no_state".to_owned(),
            OAuthError::InvalidBase64 => "invalid_base64".to_owned(),
            OAuthError::InvalidJson => "invalid_json".to_owned(),
            OAuthError::MissingUserId => "missing_user_id".to_owned(),
            OAuthError::MissingExtra(key) => format!("missing_{key}"),
            OAuthError::InvalidState => "invalid_state".to_owned(),
            OAuthError::NotConfigured => "not_configured".to_owned(),
            OAuthError::TokenFailed => "token_failed".to_owned(),
            OAuthError::UserFailed => "user_failed".to_owned(),
            OAuthError::SaveFailed => "save_failed".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_tag() {
        let tags = [
            OAuthError::AuthDenied.tag(),
            OAuthError::NoCode.tag(),
            OAuthError::NoState.tag(),
            OAuthError::InvalidBase64.tag(),
            OAuthError::InvalidJson.tag(),
            OAuthError::MissingUserId.tag(),
            OAuthError::MissingExtra("pkce_verifier".to_owned()).tag(),
            OAuthError::InvalidState.tag(),
            OAuthError::NotConfigured.tag(),
            OAuthError::TokenFailed.tag(),
            OAuthError::UserFailed.tag(),
            OAuthError::SaveFailed.tag(),
        ];
        let unique: std::collections::HashSet<_> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
    }

    #[test]
    fn missing_extra_tag_names_the_key() {
        assert_eq!(OAuthError::MissingExtra("pkce_verifier".to_owned()).tag(), "missing_pkce_verifier");
    }
}
