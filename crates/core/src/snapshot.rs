use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a parent snapshot played in producing a derived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRole {
    Source,
    DerivedFrom,
}

/// A reference to a specific version of another store-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub store_id: String,
    pub version: u64,
    pub role: ParentRole,
}

/// Metadata recorded alongside every snapshot's payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub store_id: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
    pub parents: Vec<ParentRef>,
    pub tags: Vec<String>,
}

/// A full snapshot: metadata plus its raw payload bytes (typically
/// JSON, serialized by the caller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub data: Vec<u8>,
}

/// The store-id for an account's raw snapshots: `raw/{platform}/{account_id}`.
#[must_use]
pub fn raw_store_id(platform: &str, account_id: &str) -> String {
    format!("raw/{platform}/{account_id}")
}

/// The store-id for a user's materialized timeline: `timeline/{user_id}`.
#[must_use]
pub fn timeline_store_id(user_id: &str) -> String {
    format!("timeline/{user_id}")
}

/// The sibling store-id the reddit adapter uses for its auxiliary `meta`
/// payload (karma, active subreddits). Not read by the materializer —
/// see the Open Question resolution in `DESIGN.md`.
#[must_use]
pub fn reddit_meta_store_id(account_id: &str) -> String {
    format!("raw/reddit/{account_id}/meta")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_id_grammar() {
        assert_eq!(raw_store_id("github", "acc1"), "raw/github/acc1");
        assert_eq!(timeline_store_id("user1"), "timeline/user1");
        assert_eq!(reddit_meta_store_id("acc1"), "raw/reddit/acc1/meta");
    }
}
