//! Exclusive lock over a shard store directory.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fd_lock::{RwLock, RwLockWriteGuard};
use strand_core::errors::StorageError;

const LOCK_FILE: &str = ".lock";

/// Advisory lock file preventing two builders from writing one store.
pub struct StoreLock {
    inner: RwLock<File>,
    path: String,
}

impl StoreLock {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(Self {
            inner: RwLock::new(file),
            path: path.display().to_string(),
        })
    }

    /// Take the lock without blocking. Fails with `Locked` if held elsewhere.
    pub fn try_exclusive(&mut self) -> Result<RwLockWriteGuard<'_, File>, StorageError> {
        let path = self.path.clone();
        self.inner.try_write().map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                StorageError::Locked { path }
            } else {
                StorageError::Io {
                    path,
                    message: e.to_string(),
                }
            }
        })
    }
}
