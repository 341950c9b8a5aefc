//! Call graph errors.

use super::error_code::{self, StrandErrorCode};
use super::StorageError;

/// Errors that can occur while indexing, resolving, or querying the graph.
#[derive(Debug, thiserror::Error)]
pub enum CallGraphError {
    #[error("Index spill failed: {source}")]
    SpillFailed { source: StorageError },

    #[error("Index rebuild failed after corruption: {message}")]
    RebuildFailed { message: String },

    #[error("Unknown function id {id}")]
    UnknownFunction { id: String },

    #[error("Index lookup failed for {name}: {message}")]
    LookupFailed { name: String, message: String },
}

impl StrandErrorCode for CallGraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RebuildFailed { .. } => error_code::DB_CORRUPT,
            _ => error_code::CALL_GRAPH_ERROR,
        }
    }
}
