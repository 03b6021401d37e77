use async_trait::async_trait;
use sqlx::{PgPool, Row};
use timeline_core::{ParentRef, ParentRole, Snapshot, SnapshotMeta, TimelineError};
use timeline_store::{content_hash, SnapshotStore};

/// `SnapshotStore` backed by a single `snapshots` table, keyed by
/// `(store_id, version)`. Version assignment uses a `SELECT ... FOR
/// UPDATE`-free `COALESCE(MAX(version), 0) + 1` under the same
/// transaction as the insert, relying on the primary key to reject a
/// concurrent duplicate rather than taking an explicit row lock — two
/// writers racing for the same next version see one succeed and one
/// get a unique-violation, which the caller retries.
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parent_role_str(role: ParentRole) -> &'static str {
    match role {
        ParentRole::Source => "source",
        ParentRole::DerivedFrom => "derived_from",
    }
}

fn parent_role_from_str(s: &str) -> ParentRole {
    match s {
        "derived_from" => ParentRole::DerivedFrom,
        _ => ParentRole::Source,
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn put(
        &self,
        store_id: &str,
        payload: Vec<u8>,
        tags: Vec<String>,
        parents: Vec<ParentRef>,
    ) -> Result<u64, TimelineError> {
        const MAX_ATTEMPTS: u32 = 5;
        let hash = content_hash(&payload);
        let parents_json = serde_json::to_value(
            parents
                .iter()
                .map(|p| serde_json::json!({"store_id": p.store_id, "version": p.version, "role": parent_role_str(p.role)}))
                .collect::<Vec<_>>(),
        )
        .map_err(|e| TimelineError::StoreError { operation: format!("serialize parents: {e}") })?;
        let tags_json = serde_json::to_value(&tags)
            .map_err(|e| TimelineError::StoreError { operation: format!("serialize tags: {e}") })?;

        for _ in 0..MAX_ATTEMPTS {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| TimelineError::StoreError { operation: format!("begin: {e}") })?;

            let next_version: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM snapshots WHERE store_id = $1",
            )
            .bind(store_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("select next version: {e}") })?;

            let inserted = sqlx::query(
                "INSERT INTO snapshots (store_id, version, created_at, content_hash, parents, tags, data)
                 VALUES ($1, $2, now(), $3, $4, $5, $6)
                 ON CONFLICT (store_id, version) DO NOTHING",
            )
            .bind(store_id)
            .bind(next_version)
            .bind(&hash)
            .bind(&parents_json)
            .bind(&tags_json)
            .bind(&payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| TimelineError::StoreError { operation: format!("insert snapshot: {e}") })?;

            if inserted.rows_affected() == 1 {
                tx.commit()
                    .await
                    .map_err(|e| TimelineError::StoreError { operation: format!("commit: {e}") })?;
                return Ok(next_version as u64);
            }
            // lost the race for this version; retry with a fresh MAX(version)
        }

        Err(TimelineError::StoreError { operation: "put: exhausted version-assignment retries".into() })
    }

    async fn get_latest(&self, store_id: &str) -> Result<Snapshot, TimelineError> {
        let row = sqlx::query(
            "SELECT store_id, version, created_at, content_hash, parents, tags, data
             FROM snapshots WHERE store_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("get_latest: {e}") })?
        .ok_or(TimelineError::NotFound)?;

        row_to_snapshot(&row)
    }

    async fn get_version(&self, store_id: &str, version: u64) -> Result<Snapshot, TimelineError> {
        let row = sqlx::query(
            "SELECT store_id, version, created_at, content_hash, parents, tags, data
             FROM snapshots WHERE store_id = $1 AND version = $2",
        )
        .bind(store_id)
        .bind(version as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TimelineError::StoreError { operation: format!("get_version: {e}") })?
        .ok_or(TimelineError::NotFound)?;

        row_to_snapshot(&row)
    }
}

fn row_to_snapshot(row: &sqlx::postgres::PgRow) -> Result<Snapshot, TimelineError> {
    let parents_json: serde_json::Value = row
        .try_get("parents")
        .map_err(|e| TimelineError::StoreError { operation: format!("decode parents: {e}") })?;
    let parents = parents_json
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|p| {
                    Some(ParentRef {
                        store_id: p.get("store_id")?.as_str()?.to_string(),
                        version: p.get("version")?.as_u64()?,
                        role: parent_role_from_str(p.get("role")?.as_str().unwrap_or("source")),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let tags_json: serde_json::Value = row
        .try_get("tags")
        .map_err(|e| TimelineError::StoreError { operation: format!("decode tags: {e}") })?;
    let tags = tags_json
        .as_array()
        .map(|arr| arr.iter().filter_map(|t| t.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let version: i64 = row
        .try_get("version")
        .map_err(|e| TimelineError::StoreError { operation: format!("decode version: {e}") })?;

    Ok(Snapshot {
        meta: SnapshotMeta {
            store_id: row
                .try_get("store_id")
                .map_err(|e| TimelineError::StoreError { operation: format!("decode store_id: {e}") })?,
            version: version as u64,
            created_at: row
                .try_get("created_at")
                .map_err(|e| TimelineError::StoreError { operation: format!("decode created_at: {e}") })?,
            content_hash: row
                .try_get("content_hash")
                .map_err(|e| TimelineError::StoreError { operation: format!("decode content_hash: {e}") })?,
            parents,
            tags,
        },
        data: row
            .try_get("data")
            .map_err(|e| TimelineError::StoreError { operation: format!("decode data: {e}") })?,
    })
}
