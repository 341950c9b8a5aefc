//! Cross-file call graph engine.
//!
//! Per-file extraction into persisted shards, a spill-capable resolution
//! index, ordered call resolution, and graph queries for reachability,
//! dead code, and change impact.

pub mod call_graph;
pub mod extractors;
pub mod graph;
pub mod language;
pub mod syntax;

pub use call_graph::session::{CallGraphSession, UpdateReport};
pub use language::Language;
