use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::{ApiKeyId, UserId};

/// A hashed bearer token for inbound requests. The plaintext key is
/// server-generated and never persisted; only its SHA-256 hash is
/// stored, since the key itself carries enough entropy that a slow
/// password hash would add cost without adding security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub key_hash: String,
    pub name: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    #[must_use]
    pub fn hash_plaintext(plaintext: &str) -> String {
        let digest = Sha256::digest(plaintext.as_bytes());
        hex::encode(digest)
    }

    #[must_use]
    pub fn new(user_id: UserId, name: impl Into<String>, plaintext: &str) -> Self {
        Self {
            id: ApiKeyId::new(),
            user_id,
            key_hash: Self::hash_plaintext(plaintext),
            name: name.into(),
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn matches(&self, plaintext: &str) -> bool {
        self.key_hash == Self::hash_plaintext(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_original_plaintext() {
        let key = ApiKey::new(UserId::new(), "cli", "super-secret-key");
        assert!(key.matches("super-secret-key"));
        assert!(!key.matches("wrong-key"));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ApiKey::hash_plaintext("abc"), ApiKey::hash_plaintext("abc"));
    }
}
