use std::collections::HashMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use timeline_core::UserId;
use uuid::Uuid;

use crate::error::OAuthError;

/// The payload encoded into the OAuth `state` query parameter: enough
/// to recover which user initiated the flow and to guard against
/// replay, plus whatever platform-specific extras the authorize step
/// stashed (e.g. a PKCE verifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub user_id: UserId,
    pub nonce: Uuid,
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

impl OAuthState {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, nonce: Uuid::new_v4(), extras: HashMap::new() }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Base64url-encodes the JSON-serialized state for embedding in a
    /// redirect URL.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("OAuthState always serializes");
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes and validates a `state` parameter received on callback.
    /// Validates that `user_id` is present and well-formed and that
    /// every key in `required_extras` was supplied. Each failure mode
    /// gets its own tagged variant so the front end can tell a replayed
    /// link from a missing PKCE verifier from plain corruption.
    pub fn decode(raw: &str, required_extras: &[&str]) -> Result<Self, OAuthError> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(raw).map_err(|_| OAuthError::InvalidBase64)?;

        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|_| OAuthError::InvalidJson)?;
        if value.get("user_id").is_none() {
            return Err(OAuthError::MissingUserId);
        }
        let state: OAuthState = serde_json::from_value(value).map_err(|_| OAuthError::MissingUserId)?;

        for key in required_extras {
            if !state.extras.contains_key(*key) {
                return Err(OAuthError::MissingExtra((*key).to_owned()));
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let state = OAuthState::new(UserId::new()).with_extra("pkce_verifier", "abc");
        let encoded = state.encode();
        let decoded = OAuthState::decode(&encoded, &["pkce_verifier"]).unwrap();
        assert_eq!(decoded.user_id, state.user_id);
        assert_eq!(decoded.nonce, state.nonce);
    }

    #[test]
    fn missing_required_extra_is_rejected() {
        let state = OAuthState::new(UserId::new());
        let encoded = state.encode();
        let err = OAuthState::decode(&encoded, &["pkce_verifier"]).unwrap_err();
        assert_eq!(err, OAuthError::MissingExtra("pkce_verifier".to_owned()));
        assert_eq!(err.tag(), "missing_pkce_verifier");
    }

    #[test]
    fn invalid_base64_is_rejected_with_its_own_tag() {
        let err = OAuthState::decode("not-valid-base64!!", &[]).unwrap_err();
        assert_eq!(err, OAuthError::InvalidBase64);
        assert_eq!(err.tag(), "invalid_base64");
    }

    #[test]
    fn invalid_json_is_rejected_with_its_own_tag() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"not json");
        let err = OAuthState::decode(&encoded, &[]).unwrap_err();
        assert_eq!(err, OAuthError::InvalidJson);
        assert_eq!(err.tag(), "invalid_json");
    }

    #[test]
    fn missing_user_id_is_rejected_with_its_own_tag() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"{}");
        let err = OAuthState::decode(&encoded, &[]).unwrap_err();
        assert_eq!(err, OAuthError::MissingUserId);
        assert_eq!(err.tag(), "missing_user_id");
    }
}
