//! In-memory implementations of `timeline-store`'s traits, for tests
//! and local development without a database.

pub mod metadata_store;
pub mod snapshot_store;

pub use metadata_store::MemoryMetadataStore;
pub use snapshot_store::MemorySnapshotStore;
