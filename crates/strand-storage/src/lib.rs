//! Persistence for Strand.
//!
//! Per-file shards keyed by content hash, the run manifest, and the
//! SQLite store backing the spilled and persisted resolution index.

pub mod connection;
pub mod index_store;
pub mod manifest;
pub mod migrations;
pub mod shards;

pub use index_store::{IndexRow, IndexStore};
pub use manifest::{Manifest, ManifestDiff, ManifestEntry, ShardStatus};
pub use shards::{ShardKey, ShardRecord, ShardStore, StoreLock};
