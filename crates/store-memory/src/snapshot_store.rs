use async_trait::async_trait;
use dashmap::DashMap;
use timeline_core::{ParentRef, Snapshot, TimelineError};
use timeline_store::{build_meta, SnapshotStore};

/// An in-process `SnapshotStore` backed by a `DashMap` of version
/// vectors, one per `store_id`. Used by tests and local development;
/// production deployments use `timeline-store-postgres` (or an
/// equivalent blob-backed store) instead.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<String, Vec<Snapshot>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(
        &self,
        store_id: &str,
        payload: Vec<u8>,
        tags: Vec<String>,
        parents: Vec<ParentRef>,
    ) -> Result<u64, TimelineError> {
        let mut entry = self.snapshots.entry(store_id.to_string()).or_default();
        let version = entry.len() as u64 + 1;
        let meta = build_meta(store_id, version, &payload, parents, tags);
        entry.push(Snapshot { meta, data: payload });
        Ok(version)
    }

    async fn get_latest(&self, store_id: &str) -> Result<Snapshot, TimelineError> {
        self.snapshots
            .get(store_id)
            .and_then(|v| v.last().cloned())
            .ok_or(TimelineError::NotFound)
    }

    async fn get_version(&self, store_id: &str, version: u64) -> Result<Snapshot, TimelineError> {
        self.snapshots
            .get(store_id)
            .and_then(|v| v.get((version.saturating_sub(1)) as usize).cloned())
            .ok_or(TimelineError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn versions_increase_monotonically() {
        let store = MemorySnapshotStore::new();
        let v1 = store.put("raw/github/a1", b"one".to_vec(), vec![], vec![]).await.unwrap();
        let v2 = store.put("raw/github/a1", b"two".to_vec(), vec![], vec![]).await.unwrap();
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        let latest = store.get_latest("raw/github/a1").await.unwrap();
        assert_eq!(latest.data, b"two");
        assert_eq!(store.get_version("raw/github/a1", 1).await.unwrap().data, b"one");
    }

    #[tokio::test]
    async fn missing_store_id_is_not_found() {
        let store = MemorySnapshotStore::new();
        assert!(matches!(store.get_latest("raw/github/missing").await, Err(TimelineError::NotFound)));
    }
}
