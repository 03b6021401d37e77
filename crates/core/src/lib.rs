//! Domain types and error taxonomy shared across the timeline pipeline:
//! the vocabulary every other `timeline-*` crate builds on.

pub mod account;
pub mod api_key;
pub mod config;
pub mod error;
pub mod group;
pub mod ids;
pub mod platform;
pub mod profile;
pub mod rate_limit;
pub mod snapshot;
pub mod timeline_item;
pub mod timeline_snapshot;
pub mod user;

pub use account::Account;
pub use api_key::ApiKey;
pub use config::{AppConfig, OAuthClientConfig};
pub use error::{EncryptionOp, Result, TimelineError};
pub use group::{CommitGroup, DateGroup, TimelineEntry};
pub use ids::{AccountId, ApiKeyId, ProfileFilterId, ProfileId, UserId};
pub use platform::{ItemKind, Platform};
pub use profile::{FilterKey, FilterKind, Profile, ProfileFilter};
pub use rate_limit::RateLimitState;
pub use snapshot::{raw_store_id, reddit_meta_store_id, timeline_store_id, ParentRef, ParentRole, Snapshot, SnapshotMeta};
pub use timeline_item::{ItemPayload, PullRequestState, TimelineItem};
pub use timeline_snapshot::TimelineSnapshot;
pub use user::User;
