//! Per-file extraction errors. Never fatal: they end up inside a shard.

use super::error_code::{self, StrandErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported language `{language}` for {path}")]
    UnsupportedLanguage { path: String, language: String },

    #[error("Malformed syntax for {path}: {message}")]
    Malformed { path: String, message: String },
}

impl StrandErrorCode for ExtractError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage { .. } => error_code::UNSUPPORTED_LANGUAGE,
            Self::Malformed { .. } => error_code::EXTRACT_ERROR,
        }
    }
}
