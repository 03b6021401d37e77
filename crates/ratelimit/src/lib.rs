//! Per-account rate-limit / circuit-breaker gate: decides whether a
//! scheduled fetch may proceed, and records the outcome of ones that do.

pub mod gate;

pub use gate::{FetchOutcome, RateLimitGate};
