//! Root input errors. These abort a run before any shard is produced.

use std::path::PathBuf;

use super::error_code::{self, StrandErrorCode};

/// Errors raised while enumerating or loading the inbound file set.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Root input unreadable at {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Syntax document unreadable for {path}: {message}")]
    SyntaxUnreadable { path: String, message: String },

    #[error("Duplicate file in input set: {path}")]
    DuplicateFile { path: String },

    #[error("Scan cancelled")]
    Cancelled,
}

impl StrandErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => error_code::CANCELLED,
            _ => error_code::SCAN_ERROR,
        }
    }
}
