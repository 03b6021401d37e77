use async_trait::async_trait;
use chrono::{DateTime, Utc};
use timeline_core::{Platform, TimelineError};

use crate::payload::RawPayload;

/// Rate-limit budget a provider observed on the wire while servicing
/// one `fetch`, if the platform exposes one. All-`None` for platforms
/// that don't surface rate-limit headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    pub limit_total: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// A successful fetch's payload plus whatever rate-limit budget the
/// adapter observed while fetching it, so the scheduler can feed real
/// numbers into `RateLimitGate::record_outcome` instead of guessing.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchEnvelope {
    pub payload: RawPayload,
    pub rate_limit: RateLimitInfo,
}

/// The fetch contract every platform adapter implements.
///
/// This trait is intentionally *not* object-safe: a native `async fn`
/// can't be called through `dyn Provider` without boxing its returned
/// future, and we want adapters to be usable both as concrete generic
/// types (zero-cost, for the scheduler's happy path) and behind a
/// trait object (for registries keyed by `Platform`). `DynProvider`
/// below is the object-safe bridge; implement `Provider`, get
/// `DynProvider` for free.
pub trait Provider: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetches this account's activity using the given bearer token.
    /// Errors are drawn from the shared taxonomy so the rate-limit gate
    /// can react without knowing which platform produced them.
    fn fetch(&self, token: &str) -> impl std::future::Future<Output = Result<FetchEnvelope, TimelineError>> + Send;
}

/// Object-safe counterpart to `Provider`, used wherever adapters are
/// stored behind `Arc<dyn DynProvider>` (e.g. a `Platform`-keyed
/// registry the scheduler dispatches through).
#[async_trait]
pub trait DynProvider: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError>;
}

#[async_trait]
impl<T: Provider + Sync> DynProvider for T {
    fn platform(&self) -> Platform {
        Provider::platform(self)
    }

    async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
        Provider::fetch(self, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{GithubRaw, RawPayload};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        calls: AtomicUsize,
    }

    impl Provider for MockProvider {
        fn platform(&self) -> Platform {
            Platform::Github
        }

        async fn fetch(&self, token: &str) -> Result<FetchEnvelope, TimelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token.is_empty() {
                return Err(TimelineError::AuthExpired);
            }
            Ok(FetchEnvelope {
                payload: RawPayload::Github(GithubRaw { username: "octocat".into(), repos: HashMap::new() }),
                rate_limit: RateLimitInfo::default(),
            })
        }
    }

    #[tokio::test]
    async fn provider_can_be_called_directly() {
        let provider = MockProvider { calls: AtomicUsize::new(0) };
        let result = provider.fetch("tok").await;
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_is_usable_as_dyn_provider() {
        let provider: Box<dyn DynProvider> = Box::new(MockProvider { calls: AtomicUsize::new(0) });
        assert_eq!(provider.platform(), Platform::Github);
        let result = provider.fetch("tok").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn empty_token_yields_auth_expired() {
        let provider = MockProvider { calls: AtomicUsize::new(0) };
        assert!(matches!(provider.fetch("").await, Err(TimelineError::AuthExpired)));
    }

    #[test]
    fn dyn_provider_is_object_safe() {
        fn _assert_object_safe(_: &dyn DynProvider) {}
    }
}
