//! Call graph construction: extraction into shards, indexing, resolution,
//! and assembly.

pub mod assembler;
pub mod builder;
pub mod edges;
pub mod graph;
pub mod index;
pub mod resolution;
pub mod session;
pub mod shard;
pub mod summary;
pub mod types;

pub use builder::{BuildOutcome, StreamingBuilder};
pub use edges::EdgeSet;
pub use graph::{CallEdge, CallGraph};
pub use index::{ResolutionIndex, SpillTarget};
pub use resolution::{CallResolver, ResolutionDiagnostics, ResolutionPolicy};
pub use session::{CallGraphSession, UpdateReport};
pub use summary::{IndexSource, RunSummary};
pub use types::{
    CallSite, FunctionRecord, IndexEntry, ResolutionEdge, ResolutionRule, ResolutionStatus, Shard,
};
