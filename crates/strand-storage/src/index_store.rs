//! SQLite store for resolution index entries.
//!
//! Serves as the spill target once the in-memory index exceeds its budget
//! and as the persisted index between runs. The store is derived data: a
//! failed integrity check means "rebuild from shards", never "serve it".

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use strand_core::errors::StorageError;
use strand_core::types::Visibility;
use xxhash_rust::xxh3::Xxh3;

use crate::connection;

const META_CHECKSUM: &str = "checksum";
const META_ENTRY_COUNT: &str = "entry_count";
const META_FINGERPRINT: &str = "fingerprint";

/// One index entry as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub function_id: u64,
    pub short_name: String,
    pub file: String,
    pub qualified_name: String,
    pub scope: Option<String>,
    pub visibility: Visibility,
    pub language: String,
    pub start_line: u32,
}

pub struct IndexStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore").field("path", &self.path).finish()
    }
}

fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

fn row_to_index_row(row: &Row<'_>) -> rusqlite::Result<IndexRow> {
    let visibility: String = row.get(5)?;
    Ok(IndexRow {
        function_id: row.get::<_, i64>(0)? as u64,
        short_name: row.get(1)?,
        file: row.get(2)?,
        qualified_name: row.get(3)?,
        scope: row.get(4)?,
        visibility: Visibility::from_name(&visibility).unwrap_or(Visibility::Public),
        language: row.get(6)?,
        start_line: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str =
    "function_id, short_name, file, qualified_name, scope, visibility, language, start_line";

impl IndexStore {
    /// Open or create a persistent store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            conn: connection::open(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a throwaway store that lives only as long as this value.
    pub fn open_scratch() -> Result<Self, StorageError> {
        Ok(Self {
            conn: connection::open_scratch()?,
            path: None,
        })
    }

    /// Open a persisted store and verify it was written for the shard set
    /// identified by `expected_fingerprint` and has not been damaged since.
    pub fn open_verified(path: &Path, expected_fingerprint: u64) -> Result<Self, StorageError> {
        if !path.is_file() {
            return Err(StorageError::IntegrityFailed {
                message: format!("{} does not exist", path.display()),
            });
        }
        let store = Self::open(path).map_err(|e| StorageError::IntegrityFailed {
            message: e.to_string(),
        })?;
        store.verify(expected_fingerprint)?;
        Ok(store)
    }

    fn verify(&self, expected_fingerprint: u64) -> Result<(), StorageError> {
        if !connection::pragmas::quick_check(&self.conn)? {
            return Err(StorageError::IntegrityFailed {
                message: "sqlite quick_check reported damage".to_string(),
            });
        }
        let integrity = |message: String| StorageError::IntegrityFailed { message };

        let fingerprint = self
            .meta_u64(META_FINGERPRINT)
            .map_err(|e| integrity(e.to_string()))?
            .ok_or_else(|| integrity("missing fingerprint".to_string()))?;
        if fingerprint != expected_fingerprint {
            return Err(integrity(format!(
                "fingerprint {fingerprint:016x} does not match shard set {expected_fingerprint:016x}"
            )));
        }

        let stored_count = self
            .meta_u64(META_ENTRY_COUNT)
            .map_err(|e| integrity(e.to_string()))?
            .ok_or_else(|| integrity("missing entry count".to_string()))?;
        let count = self.len().map_err(|e| integrity(e.to_string()))? as u64;
        if stored_count != count {
            return Err(integrity(format!(
                "entry count {count} does not match recorded {stored_count}"
            )));
        }

        let stored_checksum = self
            .meta_u64(META_CHECKSUM)
            .map_err(|e| integrity(e.to_string()))?
            .ok_or_else(|| integrity("missing checksum".to_string()))?;
        let checksum = self.checksum().map_err(|e| integrity(e.to_string()))?;
        if stored_checksum != checksum {
            return Err(integrity(format!(
                "checksum {checksum:016x} does not match recorded {stored_checksum:016x}"
            )));
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a batch of rows in one transaction.
    pub fn insert_batch(&mut self, rows: &[IndexRow]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction().map_err(sqlite_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO index_entries
                     (function_id, short_name, file, qualified_name, scope, visibility, language, start_line)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(sqlite_err)?;
            for row in rows {
                stmt.execute(params![
                    row.function_id as i64,
                    row.short_name,
                    row.file,
                    row.qualified_name,
                    row.scope,
                    row.visibility.name(),
                    row.language,
                    row.start_line,
                ])
                .map_err(sqlite_err)?;
            }
        }
        tx.commit().map_err(sqlite_err)
    }

    /// Remove every entry contributed by `file`. Returns the number removed.
    pub fn delete_file(&self, file: &str) -> Result<usize, StorageError> {
        self.conn
            .execute("DELETE FROM index_entries WHERE file = ?1", params![file])
            .map_err(sqlite_err)
    }

    /// All entries with the given short name, ordered by function id.
    pub fn lookup(&self, short_name: &str) -> Result<Vec<IndexRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM index_entries WHERE short_name = ?1 ORDER BY function_id"
            ))
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![short_name], row_to_index_row)
            .map_err(sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
    }

    /// Number of entries with the given short name.
    pub fn count(&self, short_name: &str) -> Result<usize, StorageError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM index_entries WHERE short_name = ?1",
                params![short_name],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .map_err(sqlite_err)
    }

    /// Entries contributed by one file, ordered by function id.
    pub fn file_rows(&self, file: &str) -> Result<Vec<IndexRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM index_entries WHERE file = ?1 ORDER BY function_id"
            ))
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![file], row_to_index_row)
            .map_err(sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
    }

    /// Distinct files with at least one entry, sorted.
    pub fn files(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT file FROM index_entries ORDER BY file")
            .map_err(sqlite_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(sqlite_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(sqlite_err)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM index_entries", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .map_err(sqlite_err)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Drop all entries and metadata.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch("DELETE FROM index_entries; DELETE FROM index_meta;")
            .map_err(sqlite_err)
    }

    /// xxh3 over every row in function-id order.
    pub fn checksum(&self) -> Result<u64, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM index_entries ORDER BY function_id"
            ))
            .map_err(sqlite_err)?;
        let mut rows = stmt.query([]).map_err(sqlite_err)?;
        let mut hasher = Xxh3::new();
        while let Some(row) = rows.next().map_err(sqlite_err)? {
            let entry = row_to_index_row(row).map_err(sqlite_err)?;
            hasher.update(&entry.function_id.to_le_bytes());
            for field in [
                entry.short_name.as_str(),
                entry.file.as_str(),
                entry.qualified_name.as_str(),
                entry.scope.as_deref().unwrap_or(""),
                entry.visibility.name(),
                entry.language.as_str(),
            ] {
                hasher.update(field.as_bytes());
                hasher.update(&[0]);
            }
            hasher.update(&entry.start_line.to_le_bytes());
        }
        Ok(hasher.digest())
    }

    /// Record checksum, entry count, and shard-set fingerprint so the next
    /// `open_verified` can trust the contents.
    pub fn seal(&mut self, fingerprint: u64) -> Result<(), StorageError> {
        let checksum = self.checksum()?;
        let count = self.len()? as u64;
        let tx = self.conn.transaction().map_err(sqlite_err)?;
        for (key, value) in [
            (META_CHECKSUM, checksum),
            (META_ENTRY_COUNT, count),
            (META_FINGERPRINT, fingerprint),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
                params![key, format!("{value:016x}")],
            )
            .map_err(sqlite_err)?;
        }
        tx.commit().map_err(sqlite_err)?;
        tracing::debug!(entries = count, "sealed persisted index");
        Ok(())
    }

    fn meta_u64(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_err)?;
        match value {
            None => Ok(None),
            Some(v) => u64::from_str_radix(&v, 16)
                .map(Some)
                .map_err(|e| StorageError::IntegrityFailed {
                    message: format!("bad {key} value `{v}`: {e}"),
                }),
        }
    }
}
