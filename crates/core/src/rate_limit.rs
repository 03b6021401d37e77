use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// The cap on exponential backoff: a provider that keeps failing never
/// gets locked out for longer than this.
pub const MAX_BACKOFF_SECONDS: i64 = 30 * 60;

/// Base delay applied on the first consecutive failure, doubling per
/// additional failure up to `MAX_BACKOFF_SECONDS`.
pub const BASE_BACKOFF_SECONDS: i64 = 60;

/// Per-account rate-limit / circuit-breaker counters.
///
/// Mutated by the rate-limit gate on every fetch outcome. Absence of a
/// row for an account is equivalent to a fresh `RateLimitState::fresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub account_id: AccountId,
    pub remaining: Option<u32>,
    pub limit_total: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub circuit_open_until: Option<DateTime<Utc>>,
}

impl RateLimitState {
    #[must_use]
    pub fn fresh(account_id: AccountId) -> Self {
        Self {
            account_id,
            remaining: None,
            limit_total: None,
            reset_at: None,
            consecutive_failures: 0,
            last_failure_at: None,
            circuit_open_until: None,
        }
    }

    /// Gate predicate: may a fetch proceed right now?
    ///
    /// Absence of state is handled by callers defaulting to `fresh`,
    /// which always allows.
    #[must_use]
    pub fn should_fetch(&self, now: DateTime<Utc>) -> bool {
        let circuit_clear = self.circuit_open_until.is_none_or(|until| until <= now);
        let has_budget = match self.remaining {
            Some(0) => self.reset_at.is_some_and(|reset| reset <= now),
            _ => true,
        };
        circuit_clear && has_budget
    }

    /// Transition on a successful fetch: reset the failure streak,
    /// optionally record provider-reported remaining/reset values.
    /// Does not retroactively shorten an outstanding `circuit_open_until`.
    pub fn record_success(&mut self, remaining: Option<u32>, limit_total: Option<u32>, reset_at: Option<DateTime<Utc>>) {
        self.consecutive_failures = 0;
        if remaining.is_some() {
            self.remaining = remaining;
        }
        if limit_total.is_some() {
            self.limit_total = limit_total;
        }
        if reset_at.is_some() {
            self.reset_at = reset_at;
        }
    }

    /// Transition on a provider-declared rate limit (HTTP 429 or
    /// equivalent), with an explicit retry-after duration.
    pub fn record_rate_limited(&mut self, now: DateTime<Utc>, retry_after_secs: i64) {
        let candidate = now + chrono::Duration::seconds(retry_after_secs.max(0));
        self.circuit_open_until = Some(match self.circuit_open_until {
            Some(existing) if existing > candidate => existing,
            _ => candidate,
        });
    }

    /// Transition on a network/5xx/parse failure: bump the failure
    /// streak and open the circuit for an exponentially growing delay,
    /// capped at `MAX_BACKOFF_SECONDS`.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures += 1;
        self.last_failure_at = Some(now);
        let backoff = backoff_seconds(self.consecutive_failures);
        self.circuit_open_until = Some(now + chrono::Duration::seconds(backoff));
    }
}

/// `60s * 2^(failures-1)` capped at `MAX_BACKOFF_SECONDS`; `failures=0`
/// yields no backoff.
#[must_use]
pub fn backoff_seconds(consecutive_failures: u32) -> i64 {
    if consecutive_failures == 0 {
        return 0;
    }
    let exp = consecutive_failures.saturating_sub(1).min(20);
    let scaled = BASE_BACKOFF_SECONDS.saturating_mul(1_i64 << exp);
    scaled.min(MAX_BACKOFF_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_allows_fetch() {
        let state = RateLimitState::fresh(AccountId::new());
        assert!(state.should_fetch(Utc::now()));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_seconds(1), 60);
        assert_eq!(backoff_seconds(2), 120);
        assert_eq!(backoff_seconds(3), 240);
        assert_eq!(backoff_seconds(10), MAX_BACKOFF_SECONDS);
    }

    #[test]
    fn failure_opens_circuit_for_at_least_base_backoff() {
        let mut state = RateLimitState::fresh(AccountId::new());
        let now = Utc::now();
        state.record_failure(now);
        assert_eq!(state.consecutive_failures, 1);
        let until = state.circuit_open_until.unwrap();
        assert!(until >= now + chrono::Duration::seconds(BASE_BACKOFF_SECONDS));
        assert!(!state.should_fetch(now));
    }

    #[test]
    fn success_resets_failures_but_not_open_circuit() {
        let mut state = RateLimitState::fresh(AccountId::new());
        let now = Utc::now();
        state.record_failure(now);
        let until_before = state.circuit_open_until;
        state.record_success(Some(10), Some(100), None);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.circuit_open_until, until_before);
    }

    #[test]
    fn rate_limited_extends_but_never_shortens() {
        let mut state = RateLimitState::fresh(AccountId::new());
        let now = Utc::now();
        state.record_rate_limited(now, 600);
        let first = state.circuit_open_until.unwrap();
        state.record_rate_limited(now, 10);
        assert_eq!(state.circuit_open_until.unwrap(), first);
    }
}
