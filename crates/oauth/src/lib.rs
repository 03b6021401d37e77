//! The authorization-code flow that links an external account to a
//! profile: state encode/decode, per-platform token exchange and
//! identity lookup, and the account upsert that ties them together.

pub mod endpoints;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod state;

pub use endpoints::{endpoints_for, PlatformEndpoints};
pub use error::OAuthError;
pub use exchange::{exchange_code, fetch_identity, Identity, TokenResponse};
pub use flow::{complete_callback, CallbackRequest};
pub use state::OAuthState;
