//! SQLite connection setup.

pub mod pragmas;

use std::path::Path;

use rusqlite::Connection;
use strand_core::errors::StorageError;

/// Open a file-backed connection with pragmas applied and migrations run.
pub fn open(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(path).map_err(|e| StorageError::SqliteError {
        message: format!("failed to open {}: {e}", path.display()),
    })?;
    pragmas::apply_pragmas(&conn)?;
    crate::migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// Open a private on-disk database that SQLite deletes on close.
///
/// Used as the spill target when the index is not persisted.
pub fn open_scratch() -> Result<Connection, StorageError> {
    let conn = Connection::open("").map_err(|e| StorageError::SqliteError {
        message: format!("failed to open scratch database: {e}"),
    })?;
    pragmas::apply_scratch_pragmas(&conn)?;
    crate::migrations::run_migrations(&conn)?;
    Ok(conn)
}
