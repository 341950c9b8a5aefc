//! Pipeline errors. Aggregates subsystem errors via `From` conversions.

use super::error_code::{self, StrandErrorCode};
use super::{CallGraphError, ConfigError, ScanError, StorageError};

/// Errors that abort a build or update run.
///
/// Per-file extraction failures and unresolved calls never show up here;
/// they are reported through shard status and edge status instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Call graph error: {0}")]
    CallGraph(#[from] CallGraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline cancelled after {completed} of {total} files")]
    Cancelled { completed: usize, total: usize },
}

impl StrandErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Scan(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::CallGraph(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Cancelled { .. } => error_code::CANCELLED,
        }
    }
}
