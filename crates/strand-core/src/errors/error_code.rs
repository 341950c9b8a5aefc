//! Structured error codes shared by every error enum.

/// Every error enum implements this to expose a stable code string
/// that callers can match on without parsing messages.
pub trait StrandErrorCode {
    /// Returns the error code string (e.g., "SCAN_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn tagged_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const EXTRACT_ERROR: &str = "EXTRACT_ERROR";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const CANCELLED: &str = "CANCELLED";
pub const CALL_GRAPH_ERROR: &str = "CALL_GRAPH_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const DB_BUSY: &str = "DB_BUSY";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
