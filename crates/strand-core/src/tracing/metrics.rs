//! Structured field names used in tracing events across Strand.
//!
//! Keeping them in one place keeps log queries stable.

/// Builder: files whose shard was extracted this run.
pub const FILES_PROCESSED: &str = "files_processed";

/// Builder: files whose shard was reused by content hash.
pub const FILES_SKIPPED: &str = "files_skipped";

/// Builder: files whose extraction failed.
pub const FILES_FAILED: &str = "files_failed";

/// Builder: wall time of the extraction phase in milliseconds.
pub const BUILD_DURATION_MS: &str = "build_duration_ms";

/// Index: whether the index spilled to disk.
pub const INDEX_SPILLED: &str = "index_spilled";

/// Index: estimated resident bytes.
pub const INDEX_RESIDENT_BYTES: &str = "index_resident_bytes";

/// Resolver: fraction of call sites resolved (0.0 - 1.0).
pub const RESOLUTION_RATE: &str = "resolution_rate";

/// Resolver: call sites re-resolved by an incremental update.
pub const RE_RESOLVED_CALL_SITES: &str = "re_resolved_call_sites";

/// Graph: node count after assembly.
pub const GRAPH_FUNCTIONS: &str = "graph_functions";

/// Graph: edge count after assembly.
pub const GRAPH_EDGES: &str = "graph_edges";
