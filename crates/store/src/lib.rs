//! Trait boundaries for the two persistence seams the pipeline depends
//! on: a content-addressed `SnapshotStore` for raw/materialized
//! payloads, and a relational `MetadataStore` for everything else.

pub mod metadata_store;
pub mod snapshot_store;

pub use metadata_store::MetadataStore;
pub use snapshot_store::{build_meta, content_hash, SnapshotStore};
