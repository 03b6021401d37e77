use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, ProfileFilterId, ProfileId, UserId};

/// A user-curated sub-view over one or more accounts.
///
/// Invariant: `(user_id, slug)` is unique; enforced by the metadata
/// store, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    #[must_use]
    pub fn new(user_id: UserId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            user_id,
            slug: slug.into(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Include,
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Repo,
    Subreddit,
    Keyword,
    AccountHandle,
}

/// An include/exclude predicate applied at timeline-read time, bound to
/// one profile and one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFilter {
    pub id: ProfileFilterId,
    pub profile_id: ProfileId,
    pub account_id: AccountId,
    pub kind: FilterKind,
    pub key: FilterKey,
    pub value: String,
}

impl ProfileFilter {
    /// Does this filter match the given field value for its key?
    ///
    /// `include` filters pass items whose value matches; `exclude`
    /// filters drop them. The caller combines the boolean results of
    /// every filter bound to the same account.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let hit = self.value.eq_ignore_ascii_case(candidate);
        match self.kind {
            FilterKind::Include => hit,
            FilterKind::Exclude => !hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(kind: FilterKind, value: &str) -> ProfileFilter {
        ProfileFilter {
            id: ProfileFilterId::new(),
            profile_id: ProfileId::new(),
            account_id: AccountId::new(),
            kind,
            key: FilterKey::Repo,
            value: value.to_string(),
        }
    }

    #[test]
    fn include_passes_only_matching_value() {
        let f = filter(FilterKind::Include, "alice/x");
        assert!(f.matches("alice/x"));
        assert!(!f.matches("alice/y"));
    }

    #[test]
    fn exclude_drops_matching_value() {
        let f = filter(FilterKind::Exclude, "alice/x");
        assert!(!f.matches("alice/x"));
        assert!(f.matches("alice/y"));
    }
}
