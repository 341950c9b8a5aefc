//! Shared constants for the Strand call graph engine.

/// Strand version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Confidence for a call resolved within the caller's file and lexical scope.
pub const DEFAULT_SAME_SCOPE_CONFIDENCE: f64 = 1.0;

/// Confidence for a call resolved through an explicit import binding.
pub const DEFAULT_IMPORT_CONFIDENCE: f64 = 0.9;

/// Confidence for a call resolved to the only candidate in the index.
pub const DEFAULT_UNIQUE_CONFIDENCE: f64 = 0.75;

/// Resolution index memory budget before spilling to disk (64 MiB).
pub const DEFAULT_INDEX_MEMORY_BUDGET: u64 = 64 * 1024 * 1024;

/// Entries kept in the hot-name cache in front of the spilled index.
pub const DEFAULT_LOOKUP_CACHE_ENTRIES: u64 = 10_000;

/// Default number of builder workers (0 = available parallelism).
pub const DEFAULT_WORKERS: usize = 0;

/// In-flight files allowed per worker before the producer blocks.
pub const DEFAULT_QUEUE_DEPTH: usize = 2;

/// Default shard store location, relative to the project root.
pub const DEFAULT_SHARD_DIR: &str = ".strand/shards";

/// Per-language resolution rate below which a warning is emitted.
pub const DEFAULT_LOW_RESOLUTION_WARNING: f64 = 0.30;

/// Resolution rate below which dead-code confidence is reduced.
pub const DEFAULT_DEAD_CODE_LOW_RESOLUTION: f64 = 0.40;

/// Name of the synthetic function owning module-level calls.
pub const MODULE_FUNCTION_NAME: &str = "<module>";

/// On-disk shard format version. Bump when the record layout changes.
pub const SHARD_FORMAT_VERSION: u32 = 1;

/// Manifest file name inside the shard store.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Persisted resolution index file name inside the shard store.
pub const INDEX_DB_FILE: &str = "index.db";
