use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use timeline_core::{ParentRef, Snapshot, SnapshotMeta, TimelineError};

/// Append-only, content-addressed storage for raw provider payloads and
/// materialized timelines.
///
/// Implementations must guarantee: a given `(store_id, version)` is
/// never rewritten, and `get_latest` returns a version no lower than
/// any version previously observed by the caller for that `store_id`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Appends `payload` as the next version under `store_id`, returning
    /// the assigned version. Versions are assigned by the store, not the
    /// caller, so concurrent writers to the same `store_id` never
    /// collide.
    async fn put(
        &self,
        store_id: &str,
        payload: Vec<u8>,
        tags: Vec<String>,
        parents: Vec<ParentRef>,
    ) -> Result<u64, TimelineError>;

    /// The highest-version snapshot for `store_id`, or `NotFound` if
    /// none has ever been written.
    async fn get_latest(&self, store_id: &str) -> Result<Snapshot, TimelineError>;

    /// A specific version of `store_id`.
    async fn get_version(&self, store_id: &str, version: u64) -> Result<Snapshot, TimelineError>;
}

/// SHA-256 hex digest of `payload`, used as the content hash recorded
/// in every `SnapshotMeta`.
#[must_use]
pub fn content_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Builds the metadata row for a freshly assigned version. Backends call
/// this so the hashing/timestamp policy lives in one place.
#[must_use]
pub fn build_meta(
    store_id: &str,
    version: u64,
    payload: &[u8],
    parents: Vec<ParentRef>,
    tags: Vec<String>,
) -> SnapshotMeta {
    SnapshotMeta {
        store_id: store_id.to_string(),
        version,
        created_at: Utc::now(),
        content_hash: content_hash(payload),
        parents,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }
}
