//! The tick-loop dispatcher: on a fixed interval, fans out across every
//! active account, gated by [`RateLimitGate`], then materializes the
//! timeline of every user that saw at least one successful fetch.
//!
//! Per-account fetches are serialized (the gate and the store are the
//! only shared mutable state, and each account has exactly one
//! in-flight future per tick); cross-account fetches run concurrently,
//! bounded by `SchedulerConfig::max_concurrent_fetches`. Materialization
//! runs after the fetch stage completes and is sequential across users,
//! which trivially satisfies "no two materializations for the same user
//! overlap" without needing a per-user lock.

pub mod registry;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use secrecy::ExposeSecret;
use timeline_core::{Account, TimelineError, UserId};
use timeline_crypto::PayloadEncryptor;
use timeline_provider::DynProvider;
use timeline_ratelimit::{FetchOutcome, RateLimitGate};
use timeline_store::{MetadataStore, SnapshotStore};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, warn};

/// Builds the adapter to use for one account's platform. Production
/// code wires this to [`registry::build_provider`]; tests substitute a
/// closure that hands back `MemoryProvider` fakes.
pub type ProviderBuilder = Arc<dyn Fn(&Account) -> Arc<dyn DynProvider> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often a tick runs (default: 5 minutes).
    pub tick_interval: Duration,
    /// Wall-clock budget for one tick's fetch fan-out (default: 4 minutes,
    /// deliberately less than `tick_interval` so a slow tick never
    /// overlaps the next one).
    pub tick_budget: Duration,
    /// Upper bound on concurrently in-flight fetches across all accounts.
    pub max_concurrent_fetches: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(300),
            tick_budget: Duration::from_secs(240),
            max_concurrent_fetches: 16,
        }
    }
}

impl From<&timeline_core::AppConfig> for SchedulerConfig {
    fn from(config: &timeline_core::AppConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            tick_budget: config.tick_budget,
            max_concurrent_fetches: config.max_concurrent_fetches,
        }
    }
}

/// Summary of one tick, returned for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub accounts_considered: usize,
    pub accounts_fetched: usize,
    pub accounts_skipped_by_gate: usize,
    pub accounts_failed: usize,
    pub users_materialized: usize,
    pub timed_out: bool,
}

pub struct Scheduler {
    metadata: Arc<dyn MetadataStore>,
    snapshots: Arc<dyn SnapshotStore>,
    encryptor: Arc<PayloadEncryptor>,
    gate: RateLimitGate<dyn MetadataStore>,
    provider_builder: ProviderBuilder,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        snapshots: Arc<dyn SnapshotStore>,
        encryptor: Arc<PayloadEncryptor>,
        config: SchedulerConfig,
    ) -> Self {
        let client = Client::new();
        let gate = RateLimitGate::new(Arc::clone(&metadata));
        Self {
            metadata,
            snapshots,
            encryptor,
            gate,
            provider_builder: Arc::new(move |account: &Account| registry::build_provider(client.clone(), account)),
            config,
        }
    }

    /// Overrides how adapters are built per account. Used by tests to
    /// substitute `MemoryProvider` fakes instead of real HTTP clients.
    #[must_use]
    pub fn with_provider_builder(mut self, builder: ProviderBuilder) -> Self {
        self.provider_builder = builder;
        self
    }

    /// Runs until `shutdown_rx` fires, ticking every `tick_interval`.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut ticker = interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("scheduler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_tick().await;
                    debug!(
                        considered = report.accounts_considered,
                        fetched = report.accounts_fetched,
                        skipped = report.accounts_skipped_by_gate,
                        failed = report.accounts_failed,
                        materialized = report.users_materialized,
                        timed_out = report.timed_out,
                        "tick complete"
                    );
                }
            }
        }
    }

    /// Runs exactly one tick: the algorithm in full.
    pub async fn run_tick(&self) -> TickReport {
        let accounts = match self.metadata.list_active_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "failed to list active accounts, skipping tick");
                return TickReport::default();
            }
        };

        let mut report = TickReport { accounts_considered: accounts.len(), ..TickReport::default() };

        let deadline = tokio::time::Instant::now() + self.config.tick_budget;
        let mut fetches = stream::iter(accounts).map(|account| self.fetch_account(account)).buffer_unordered(self.config.max_concurrent_fetches);

        let mut affected_users: HashSet<UserId> = HashSet::new();
        loop {
            match tokio::time::timeout_at(deadline, fetches.next()).await {
                Ok(Some(FetchResult::Fetched(user_id))) => {
                    report.accounts_fetched += 1;
                    affected_users.insert(user_id);
                }
                Ok(Some(FetchResult::SkippedByGate)) => report.accounts_skipped_by_gate += 1,
                Ok(Some(FetchResult::Failed)) => report.accounts_failed += 1,
                Ok(None) => break,
                Err(_) => {
                    warn!("tick budget exceeded, abandoning outstanding fetches");
                    report.timed_out = true;
                    break;
                }
            }
        }

        for user_id in affected_users {
            match self.materialize_user(user_id).await {
                Ok(()) => report.users_materialized += 1,
                Err(e) => error!(%user_id, error = %e, "failed to materialize timeline"),
            }
        }

        report
    }

    async fn fetch_account(&self, account: Account) -> FetchResult {
        match self.fetch_one(&account).await {
            Ok(Some(user_id)) => FetchResult::Fetched(user_id),
            Ok(None) => FetchResult::SkippedByGate,
            Err(e) => {
                warn!(account_id = %account.id, platform = %account.platform, error = %e, "fetch failed");
                FetchResult::Failed
            }
        }
    }

    /// Fetches one account if the gate allows it. Returns the owning
    /// user id on a successful fetch, `None` if the gate skipped it.
    async fn fetch_one(&self, account: &Account) -> Result<Option<UserId>, TimelineError> {
        if !self.gate.should_fetch(account.id).await? {
            return Ok(None);
        }

        let token = self.encryptor.decrypt_str(&account.access_token_ciphertext).map_err(|_| TimelineError::EncryptionError {
            op: timeline_core::EncryptionOp::Decrypt,
        })?;

        let provider = (self.provider_builder)(account);
        match provider.fetch(token.expose_secret()).await {
            Ok(envelope) => {
                self.on_fetch_success(account, &envelope).await?;
                let profile = self.metadata.get_profile(account.profile_id).await?;
                Ok(Some(profile.user_id))
            }
            Err(TimelineError::RateLimited { retry_after }) => {
                self.gate
                    .record_outcome(account.id, FetchOutcome::RateLimited { retry_after_secs: retry_after.as_secs() as i64 })
                    .await?;
                Ok(None)
            }
            Err(TimelineError::AuthExpired) => {
                self.gate.record_outcome(account.id, FetchOutcome::AuthRevoked).await?;
                self.metadata.deactivate_account(account.id).await?;
                Ok(None)
            }
            Err(e) => {
                self.gate.record_outcome(account.id, FetchOutcome::ProviderFailure).await?;
                Err(e)
            }
        }
    }

    async fn on_fetch_success(&self, account: &Account, envelope: &timeline_provider::FetchEnvelope) -> Result<(), TimelineError> {
        let bytes = serde_json::to_vec(&envelope.payload).map_err(|e| TimelineError::ParseError(e.to_string()))?;
        let tags = vec![format!("platform:{}", account.platform), format!("account:{}", account.id)];
        self.snapshots.put(&account.raw_store_id(), bytes, tags, Vec::new()).await?;
        self.gate
            .record_outcome(
                account.id,
                FetchOutcome::Success {
                    remaining: envelope.rate_limit.remaining,
                    limit_total: envelope.rate_limit.limit_total,
                    reset_at: envelope.rate_limit.reset_at,
                },
            )
            .await?;
        self.metadata.touch_last_fetched(account.id).await?;
        Ok(())
    }

    async fn materialize_user(&self, user_id: UserId) -> Result<(), TimelineError> {
        let mut inputs = Vec::new();
        for profile in self.metadata.list_profiles_for_user(user_id).await? {
            for account in self.metadata.list_accounts_for_profile(profile.id).await? {
                if account.is_active {
                    inputs.push(timeline_materialize::MaterializeInput::for_account(&account));
                }
            }
        }
        timeline_materialize::materialize(&self.snapshots, user_id, &inputs).await?;
        Ok(())
    }
}

enum FetchResult {
    Fetched(UserId),
    SkippedByGate,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::Platform;
    use timeline_provider::payload::{GithubRaw, RawPayload};
    use timeline_provider::MemoryProvider;
    use timeline_store_memory::{MemoryMetadataStore, MemorySnapshotStore};

    fn memory_provider_builder() -> ProviderBuilder {
        Arc::new(|account: &Account| {
            let provider = MemoryProvider::new(account.platform);
            provider.set_payload(RawPayload::Github(GithubRaw { username: account.platform_handle.clone(), repos: Default::default() }));
            Arc::new(provider) as Arc<dyn DynProvider>
        })
    }

    fn test_scheduler() -> (Scheduler, Arc<MemoryMetadataStore>, Arc<MemorySnapshotStore>) {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let encryptor = Arc::new(PayloadEncryptor::from_password("test-password-at-least-32-bytes"));
        let scheduler = Scheduler::new(
            metadata.clone() as Arc<dyn MetadataStore>,
            snapshots.clone() as Arc<dyn SnapshotStore>,
            encryptor,
            SchedulerConfig::default(),
        )
        .with_provider_builder(memory_provider_builder());
        (scheduler, metadata, snapshots)
    }

    #[tokio::test]
    async fn successful_fetch_writes_snapshot_and_materializes() {
        let (scheduler, metadata, snapshots) = test_scheduler();
        let user_id = UserId::new();
        let profile = timeline_core::Profile::new(user_id, "main", "Main");
        metadata.seed_profile(profile.clone());

        let ciphertext = scheduler.encryptor.encrypt_str("tok").unwrap();
        let account = Account::new(profile.id, Platform::Github, "1", "octocat", ciphertext);
        metadata.upsert_account(account.clone()).await.unwrap();

        let report = scheduler.run_tick().await;
        assert_eq!(report.accounts_fetched, 1);
        assert_eq!(report.users_materialized, 1);

        let snapshot = snapshots.get_latest(&account.raw_store_id()).await.unwrap();
        assert!(!snapshot.data.is_empty());

        let timeline = snapshots.get_latest(&timeline_core::timeline_store_id(&user_id.to_string())).await.unwrap();
        assert!(!timeline.data.is_empty());
    }

    #[tokio::test]
    async fn gate_closed_account_is_skipped_without_fetching() {
        let (scheduler, metadata, _snapshots) = test_scheduler();
        let user_id = UserId::new();
        let profile = timeline_core::Profile::new(user_id, "main", "Main");
        metadata.seed_profile(profile.clone());

        let ciphertext = scheduler.encryptor.encrypt_str("tok").unwrap();
        let account = Account::new(profile.id, Platform::Github, "1", "octocat", ciphertext);
        metadata.upsert_account(account.clone()).await.unwrap();

        scheduler
            .gate
            .record_outcome(account.id, FetchOutcome::RateLimited { retry_after_secs: 600 })
            .await
            .unwrap();

        let report = scheduler.run_tick().await;
        assert_eq!(report.accounts_fetched, 0);
        assert_eq!(report.accounts_skipped_by_gate, 1);
        assert_eq!(report.users_materialized, 0);
    }

    #[tokio::test]
    async fn auth_expired_deactivates_account() {
        let (scheduler, metadata, _snapshots) = test_scheduler();
        let user_id = UserId::new();
        let profile = timeline_core::Profile::new(user_id, "main", "Main");
        metadata.seed_profile(profile.clone());

        let ciphertext = scheduler.encryptor.encrypt_str("tok").unwrap();
        let account = Account::new(profile.id, Platform::Github, "1", "octocat", ciphertext);
        metadata.upsert_account(account.clone()).await.unwrap();

        let scheduler = scheduler.with_provider_builder(Arc::new(|account: &Account| {
            let provider = MemoryProvider::new(account.platform);
            provider.simulate_auth_expired();
            Arc::new(provider) as Arc<dyn DynProvider>
        }));

        let report = scheduler.run_tick().await;
        assert_eq!(report.accounts_failed, 0);
        assert_eq!(report.accounts_fetched, 0);

        let stored = metadata.get_account(account.id).await.unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn provider_failure_is_counted_and_does_not_panic() {
        let (scheduler, metadata, _snapshots) = test_scheduler();
        let user_id = UserId::new();
        let profile = timeline_core::Profile::new(user_id, "main", "Main");
        metadata.seed_profile(profile.clone());

        let ciphertext = scheduler.encryptor.encrypt_str("tok").unwrap();
        let account = Account::new(profile.id, Platform::Github, "1", "octocat", ciphertext);
        metadata.upsert_account(account.clone()).await.unwrap();

        let scheduler = scheduler.with_provider_builder(Arc::new(|account: &Account| {
            let provider = MemoryProvider::new(account.platform);
            provider.simulate_network_error();
            Arc::new(provider) as Arc<dyn DynProvider>
        }));

        let report = scheduler.run_tick().await;
        assert_eq!(report.accounts_failed, 1);
        assert_eq!(report.users_materialized, 0);
    }

    #[tokio::test]
    async fn successful_fetch_propagates_provider_rate_limit_budget() {
        let (scheduler, metadata, _snapshots) = test_scheduler();
        let user_id = UserId::new();
        let profile = timeline_core::Profile::new(user_id, "main", "Main");
        metadata.seed_profile(profile.clone());

        let ciphertext = scheduler.encryptor.encrypt_str("tok").unwrap();
        let account = Account::new(profile.id, Platform::Github, "1", "octocat", ciphertext);
        metadata.upsert_account(account.clone()).await.unwrap();

        let scheduler = scheduler.with_provider_builder(Arc::new(|account: &Account| {
            let provider = MemoryProvider::new(account.platform);
            provider.set_payload(RawPayload::Github(GithubRaw { username: account.platform_handle.clone(), repos: Default::default() }));
            provider.set_rate_limit(timeline_provider::RateLimitInfo { remaining: Some(17), limit_total: Some(5000), reset_at: None });
            Arc::new(provider) as Arc<dyn DynProvider>
        }));

        let report = scheduler.run_tick().await;
        assert_eq!(report.accounts_fetched, 1);

        let state = metadata.get_rate_limit_state(account.id).await.unwrap().unwrap();
        assert_eq!(state.remaining, Some(17));
        assert_eq!(state.limit_total, Some(5000));
    }
}
