//! Assembles a user's materialized timeline from the latest raw
//! snapshot of each of their accounts.
//!
//! `materialize` is the only writer of `timeline/{user_id}`. It is pure
//! orchestration: read raw snapshots, normalize, group, write — no
//! network calls and no rate-limit bookkeeping, both of which live one
//! layer up in the scheduler.

use std::sync::Arc;

use timeline_core::{Account, AccountId, ParentRef, ParentRole, Platform, TimelineError, TimelineSnapshot, UserId};
use timeline_store::SnapshotStore;
use tracing::warn;

/// One account to fold into a user's timeline: its id, platform, and
/// the raw-snapshot store-id to read from.
#[derive(Debug, Clone)]
pub struct MaterializeInput {
    pub account_id: AccountId,
    pub platform: Platform,
    pub raw_store_id: String,
}

impl MaterializeInput {
    #[must_use]
    pub fn for_account(account: &Account) -> Self {
        Self { account_id: account.id, platform: account.platform, raw_store_id: account.raw_store_id() }
    }
}

/// Reads each input's latest raw snapshot, normalizes, groups, and
/// writes the result to `timeline/{user_id}`. Accounts with no raw
/// snapshot yet are skipped rather than failing the whole run.
///
/// # Errors
/// Returns an error only if the final write to the snapshot store
/// fails; a per-account read/parse failure is logged and that account
/// is simply omitted from the resulting timeline.
pub async fn materialize(
    store: &Arc<dyn SnapshotStore>,
    user_id: UserId,
    inputs: &[MaterializeInput],
) -> Result<TimelineSnapshot, TimelineError> {
    let mut items = Vec::new();
    let mut parents = Vec::new();

    for input in inputs {
        let snapshot = match store.get_latest(&input.raw_store_id).await {
            Ok(s) => s,
            Err(TimelineError::NotFound) => continue,
            Err(e) => {
                warn!(account_id = %input.account_id, error = %e, "skipping account with unreadable raw snapshot");
                continue;
            }
        };

        let raw: timeline_provider::RawPayload = match serde_json::from_slice(&snapshot.data) {
            Ok(r) => r,
            Err(e) => {
                warn!(account_id = %input.account_id, error = %e, "skipping account with unparseable raw snapshot");
                continue;
            }
        };

        match timeline_normalize::normalize(&raw) {
            Ok(normalized) => items.extend(normalized),
            Err(e) => {
                warn!(account_id = %input.account_id, error = %e, "normalizer rejected raw snapshot");
                continue;
            }
        }

        parents.push(ParentRef { store_id: input.raw_store_id.clone(), version: snapshot.meta.version, role: ParentRole::Source });
    }

    let date_groups = timeline_group::group(items);
    let store_id = timeline_core::timeline_store_id(&user_id.to_string());
    let payload = serde_json::to_vec(&date_groups).map_err(|e| TimelineError::ParseError(e.to_string()))?;
    let version = store.put(&store_id, payload, vec!["timeline".to_string()], parents).await?;
    let written = store.get_version(&store_id, version).await?;

    Ok(TimelineSnapshot { meta: written.meta, date_groups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use timeline_core::{ItemKind, ItemPayload, ProfileId, UserId};
    use timeline_provider::{GithubCommit, GithubRaw, GithubRepoActivity, RawPayload};
    use timeline_store_memory::MemorySnapshotStore;

    fn sample_account() -> Account {
        Account::new(ProfileId::new(), Platform::Github, "123", "octocat", "ciphertext")
    }

    #[tokio::test]
    async fn materialize_skips_accounts_with_no_snapshot() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::default());
        let account = sample_account();
        let input = MaterializeInput::for_account(&account);
        let snapshot = materialize(&store, UserId::new(), &[input]).await.unwrap();
        assert!(snapshot.date_groups.is_empty());
    }

    #[tokio::test]
    async fn materialize_writes_lineage_parents() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::default());
        let account = sample_account();
        let mut repos = HashMap::new();
        repos.insert(
            "acme/widgets".to_string(),
            GithubRepoActivity {
                commits: vec![GithubCommit {
                    sha: "aaa".into(),
                    message: "fix".into(),
                    timestamp: chrono::Utc::now(),
                    branch: "main".into(),
                    additions: 1,
                    deletions: 0,
                    files_changed: 1,
                }],
                pull_requests: vec![],
            },
        );
        let raw = RawPayload::Github(GithubRaw { username: "octocat".into(), repos });
        let bytes = serde_json::to_vec(&raw).unwrap();
        store.put(&account.raw_store_id(), bytes, vec![], vec![]).await.unwrap();

        let input = MaterializeInput::for_account(&account);
        let snapshot = materialize(&store, UserId::new(), &[input]).await.unwrap();
        assert_eq!(snapshot.meta.parents.len(), 1);
        assert_eq!(snapshot.meta.parents[0].store_id, account.raw_store_id());
        assert_eq!(snapshot.date_groups.len(), 1);
    }

    #[test]
    fn item_kind_filter_has_commit_variant() {
        assert_eq!(ItemKind::Commit.as_str(), "commit");
        let _ = ItemPayload::Commit { repo: String::new(), branch: String::new(), sha: String::new(), additions: 0, deletions: 0, files_changed: 0 };
    }
}
