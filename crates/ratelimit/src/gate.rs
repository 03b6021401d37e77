use std::sync::Arc;

use chrono::Utc;
use timeline_core::{AccountId, RateLimitState, TimelineError};
use timeline_store::MetadataStore;
use tracing::{debug, warn};

/// The outcome of one fetch attempt, as observed by the scheduler.
/// Drives exactly one state transition in the table documented
/// alongside this module.
pub enum FetchOutcome {
    Success { remaining: Option<u32>, limit_total: Option<u32>, reset_at: Option<chrono::DateTime<Utc>> },
    RateLimited { retry_after_secs: i64 },
    ProviderFailure,
    AuthRevoked,
}

/// Per-account gate over fetch attempts, backed by `RateLimitState` rows
/// in the `MetadataStore`.
///
/// A single row per account means concurrent access is naturally
/// serialized by the scheduler's per-account sequential-fetch guarantee
/// — no distributed lock is needed on this path, unlike the persisted
/// circuit-breaker state the teacher guards with one, since here only
/// one writer (the scheduler) ever mutates a given account's row at a
/// time.
pub struct RateLimitGate<M: MetadataStore + ?Sized> {
    store: Arc<M>,
}

impl<M: MetadataStore + ?Sized> RateLimitGate<M> {
    #[must_use]
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    /// Reads current state (treating absence as `RateLimitState::fresh`)
    /// and applies `should_fetch`.
    pub async fn should_fetch(&self, account_id: AccountId) -> Result<bool, TimelineError> {
        let state = self
            .store
            .get_rate_limit_state(account_id)
            .await?
            .unwrap_or_else(|| RateLimitState::fresh(account_id));
        Ok(state.should_fetch(Utc::now()))
    }

    /// Applies a fetch outcome's transition and persists the result.
    pub async fn record_outcome(&self, account_id: AccountId, outcome: FetchOutcome) -> Result<(), TimelineError> {
        let mut state = self
            .store
            .get_rate_limit_state(account_id)
            .await?
            .unwrap_or_else(|| RateLimitState::fresh(account_id));
        let now = Utc::now();

        match outcome {
            FetchOutcome::Success { remaining, limit_total, reset_at } => {
                state.record_success(remaining, limit_total, reset_at);
                debug!(%account_id, "fetch succeeded, gate closed");
            }
            FetchOutcome::RateLimited { retry_after_secs } => {
                state.record_rate_limited(now, retry_after_secs);
                warn!(%account_id, retry_after_secs, "provider rate limited this account");
            }
            FetchOutcome::ProviderFailure => {
                state.record_failure(now);
                warn!(%account_id, consecutive_failures = state.consecutive_failures, "provider failure recorded");
            }
            FetchOutcome::AuthRevoked => {
                // Auth revocation is handled by the caller deactivating the
                // account in the metadata store; the gate only records that
                // no further automatic retries should happen by treating it
                // like an indefinite-ish failure streak capped at the same
                // backoff ceiling as any other failure.
                state.record_failure(now);
                warn!(%account_id, "auth revoked, account should be deactivated by caller");
            }
        }

        self.store.upsert_rate_limit_state(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_store_memory::MemoryMetadataStore;

    #[tokio::test]
    async fn fresh_account_may_fetch() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = RateLimitGate::new(store);
        assert!(gate.should_fetch(AccountId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn rate_limited_blocks_until_retry_after_elapses() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = RateLimitGate::new(store);
        let account_id = AccountId::new();
        gate.record_outcome(account_id, FetchOutcome::RateLimited { retry_after_secs: 120 }).await.unwrap();
        assert!(!gate.should_fetch(account_id).await.unwrap());
    }

    #[tokio::test]
    async fn success_after_failure_resets_streak_but_not_open_circuit() {
        let store = Arc::new(MemoryMetadataStore::new());
        let gate = RateLimitGate::new(store);
        let account_id = AccountId::new();
        gate.record_outcome(account_id, FetchOutcome::ProviderFailure).await.unwrap();
        assert!(!gate.should_fetch(account_id).await.unwrap());
        gate.record_outcome(account_id, FetchOutcome::Success { remaining: None, limit_total: None, reset_at: None })
            .await
            .unwrap();
        // circuit_open_until from the failure is still in the future; a
        // success does not retroactively clear it.
        assert!(!gate.should_fetch(account_id).await.unwrap());
    }
}
