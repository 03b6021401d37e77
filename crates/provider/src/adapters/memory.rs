use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use timeline_core::{Platform, TimelineError};

use crate::payload::RawPayload;
use crate::provider::{FetchEnvelope, Provider, RateLimitInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Canned {
    None,
    Payload,
    RateLimited,
    AuthExpired,
    Network,
}

/// A memory-backed fake satisfying the same `Provider` contract as the
/// real adapters, with setters for canned responses and a call counter.
/// Used by `timeline-scheduler` and `timeline-materialize` tests so
/// they never need a live network call.
pub struct MemoryProvider {
    platform: Platform,
    payload: Mutex<Option<RawPayload>>,
    rate_limit: Mutex<RateLimitInfo>,
    mode: Mutex<Canned>,
    calls: AtomicU32,
}

impl MemoryProvider {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            payload: Mutex::new(None),
            rate_limit: Mutex::new(RateLimitInfo::default()),
            mode: Mutex::new(Canned::None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_payload(&self, payload: RawPayload) {
        *self.payload.lock().unwrap() = Some(payload);
        *self.mode.lock().unwrap() = Canned::Payload;
    }

    /// Canned rate-limit budget reported alongside the next successful fetch.
    pub fn set_rate_limit(&self, info: RateLimitInfo) {
        *self.rate_limit.lock().unwrap() = info;
    }

    pub fn simulate_rate_limited(&self) {
        *self.mode.lock().unwrap() = Canned::RateLimited;
    }

    pub fn simulate_auth_expired(&self) {
        *self.mode.lock().unwrap() = Canned::AuthExpired;
    }

    pub fn simulate_network_error(&self) {
        *self.mode.lock().unwrap() = Canned::Network;
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for MemoryProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, _token: &str) -> Result<FetchEnvelope, TimelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            Canned::RateLimited => Err(TimelineError::RateLimited { retry_after: std::time::Duration::from_secs(120) }),
            Canned::AuthExpired => Err(TimelineError::AuthExpired),
            Canned::Network => Err(TimelineError::NetworkError { cause: "simulated".into() }),
            Canned::None | Canned::Payload => {
                let payload = self
                    .payload
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| TimelineError::ParseError("MemoryProvider has no canned payload set".into()))?;
                Ok(FetchEnvelope { payload, rate_limit: *self.rate_limit.lock().unwrap() })
            }
        }
    }
}
