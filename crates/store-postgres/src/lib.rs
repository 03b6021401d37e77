//! PostgreSQL-backed implementations of `timeline-store`'s traits.

pub mod metadata_store;
pub mod pool;
pub mod snapshot_store;

pub use metadata_store::PgMetadataStore;
pub use pool::connect;
pub use snapshot_store::PgSnapshotStore;
