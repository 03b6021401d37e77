use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, ProfileId};
use crate::platform::Platform;

/// A linked external identity on one `Platform`, owned by a `Profile`.
///
/// Invariant: `(profile_id, platform, platform_user_id)` is unique,
/// enforced by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub profile_id: ProfileId,
    pub platform: Platform,
    pub platform_user_id: String,
    pub platform_handle: String,
    /// Base64 ciphertext, never the plaintext token.
    pub access_token_ciphertext: String,
    pub refresh_token_ciphertext: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn new(
        profile_id: ProfileId,
        platform: Platform,
        platform_user_id: impl Into<String>,
        platform_handle: impl Into<String>,
        access_token_ciphertext: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            profile_id,
            platform,
            platform_user_id: platform_user_id.into(),
            platform_handle: platform_handle.into(),
            access_token_ciphertext: access_token_ciphertext.into(),
            refresh_token_ciphertext: None,
            token_expires_at: None,
            is_active: true,
            last_fetched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|exp| exp <= now)
    }

    /// The content-addressed store-id for this account's raw snapshots.
    #[must_use]
    pub fn raw_store_id(&self) -> String {
        format!("raw/{}/{}", self.platform, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn raw_store_id_matches_grammar() {
        let acc = Account::new(ProfileId::new(), Platform::Github, "123", "octocat", "ct");
        assert_eq!(acc.raw_store_id(), format!("raw/github/{}", acc.id));
    }

    #[test]
    fn expiry_check() {
        let mut acc = Account::new(ProfileId::new(), Platform::Github, "1", "h", "ct");
        let now = Utc::now();
        assert!(!acc.is_token_expired(now));
        acc.token_expires_at = Some(now - Duration::seconds(1));
        assert!(acc.is_token_expired(now));
        acc.token_expires_at = Some(now + Duration::seconds(60));
        assert!(!acc.is_token_expired(now));
    }
}
