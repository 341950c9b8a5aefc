//! Storage errors for the shard store and the persisted index.

use super::error_code::{self, StrandErrorCode};

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("IO error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error for {path}: {message}")]
    Serialization { path: String, message: String },

    #[error("Corrupt shard {path}: {message}")]
    CorruptShard { path: String, message: String },

    #[error("Index integrity check failed: {message}")]
    IntegrityFailed { message: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Shard store {path} is locked by another process")]
    Locked { path: String },
}

impl StorageError {
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl StrandErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CorruptShard { .. } | Self::IntegrityFailed { .. } => error_code::DB_CORRUPT,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::Locked { .. } => error_code::DB_BUSY,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
