//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, 64MB page cache, 256MB mmap, 5s busy_timeout.

use rusqlite::Connection;
use strand_core::errors::StorageError;

/// Apply performance and safety pragmas to a file-backed connection.
pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -64000;
        PRAGMA mmap_size = 268435456;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Scratch databases are thrown away on close, so durability is off.
pub fn apply_scratch_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = OFF;
        PRAGMA synchronous = OFF;
        PRAGMA cache_size = -16000;
        PRAGMA temp_store = FILE;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply scratch pragmas: {e}"),
    })
}

/// Run SQLite's structural check. Returns `Ok(false)` on any reported damage.
pub fn quick_check(conn: &Connection) -> Result<bool, StorageError> {
    let result: String = conn
        .pragma_query_value(None, "quick_check", |row| row.get(0))
        .map_err(|e| StorageError::IntegrityFailed {
            message: e.to_string(),
        })?;
    Ok(result.eq_ignore_ascii_case("ok"))
}
