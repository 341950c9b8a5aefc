//! Directory of shard files keyed by (path, content hash).
//!
//! Layout: `<root>/<pp>/<path_hash>-<content_hash>.json` where `pp` is the
//! first byte of the path hash. Every write goes to a temp file in the same
//! directory and is renamed into place, so a reader never sees a partial
//! shard.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use strand_core::constants::SHARD_FORMAT_VERSION;
use strand_core::errors::StorageError;
use xxhash_rust::xxh3::xxh3_64;

use super::record::ShardRecord;

const SHARD_EXT: &str = "json";
const TMP_EXT: &str = "tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of one persisted shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardKey {
    pub path_hash: u64,
    pub content_hash: u64,
}

impl ShardKey {
    pub fn new(file: &str, content_hash: u64) -> Self {
        Self {
            path_hash: xxh3_64(file.as_bytes()),
            content_hash,
        }
    }

    fn file_name(&self) -> String {
        format!(
            "{:016x}-{:016x}.{SHARD_EXT}",
            self.path_hash, self.content_hash
        )
    }

    fn bucket(&self) -> String {
        format!("{:02x}", self.path_hash >> 56)
    }

    fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".json")?;
        let (path, content) = stem.split_once('-')?;
        Some(Self {
            path_hash: u64::from_str_radix(path, 16).ok()?,
            content_hash: u64::from_str_radix(content, 16).ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShardStore {
    root: PathBuf,
}

impl ShardStore {
    /// Open (and create if needed) a shard store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root).map_err(|e| StorageError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the shard for `key` lives (whether or not it exists).
    pub fn path_for(&self, key: &ShardKey) -> PathBuf {
        self.root.join(key.bucket()).join(key.file_name())
    }

    pub fn contains(&self, key: &ShardKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Persist a shard atomically and drop superseded shards of the same file.
    pub fn write(&self, record: &ShardRecord) -> Result<ShardKey, StorageError> {
        let key = ShardKey::new(&record.file, record.content_hash);
        let target = self.path_for(&key);
        let dir = self.root.join(key.bucket());
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let bytes = serde_json::to_vec(record).map_err(|e| StorageError::Serialization {
            path: record.file.clone(),
            message: e.to_string(),
        })?;

        let tmp = dir.join(format!(
            "{}.{}.{}.{TMP_EXT}",
            key.file_name(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let result = write_and_sync(&tmp, &bytes).and_then(|()| {
            fs::rename(&tmp, &target).map_err(|e| StorageError::io(&target, e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result?;

        self.remove_superseded(&key)?;
        Ok(key)
    }

    /// Read a shard. Missing shards are `Ok(None)`; unreadable ones are
    /// `CorruptShard` so the caller can re-extract.
    pub fn read(&self, key: &ShardKey) -> Result<Option<ShardRecord>, StorageError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        let record: ShardRecord =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptShard {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        if record.format_version != SHARD_FORMAT_VERSION {
            return Err(StorageError::CorruptShard {
                path: path.display().to_string(),
                message: format!(
                    "format version {} (expected {SHARD_FORMAT_VERSION})",
                    record.format_version
                ),
            });
        }
        if ShardKey::new(&record.file, record.content_hash) != *key {
            return Err(StorageError::CorruptShard {
                path: path.display().to_string(),
                message: "shard contents do not match its key".to_string(),
            });
        }
        Ok(Some(record))
    }

    /// All persisted shard keys, sorted.
    pub fn keys(&self) -> Result<Vec<ShardKey>, StorageError> {
        let mut keys = Vec::new();
        for (_, name) in self.walk()? {
            if let Some(key) = ShardKey::parse(&name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Delete every shard for which `keep` returns false, plus leftover
    /// temp files from interrupted writes. Returns the number removed.
    pub fn retain<F>(&self, mut keep: F) -> Result<usize, StorageError>
    where
        F: FnMut(&ShardKey) -> bool,
    {
        let mut removed = 0;
        for (path, name) in self.walk()? {
            let stale = match ShardKey::parse(&name) {
                Some(key) => !keep(&key),
                None => name.ends_with(TMP_EXT),
            };
            if stale {
                fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "removed stale shards");
        }
        Ok(removed)
    }

    fn remove_superseded(&self, key: &ShardKey) -> Result<(), StorageError> {
        let dir = self.root.join(key.bucket());
        let prefix = format!("{:016x}-", key.path_hash);
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) {
                continue;
            }
            if let Some(other) = ShardKey::parse(&name) {
                if other != *key {
                    let path = entry.path();
                    fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
                }
            }
        }
        Ok(())
    }

    fn walk(&self) -> Result<Vec<(PathBuf, String)>, StorageError> {
        let mut out = Vec::new();
        let buckets = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        for bucket in buckets.flatten() {
            let bucket_path = bucket.path();
            if !bucket_path.is_dir() {
                continue;
            }
            let files = fs::read_dir(&bucket_path).map_err(|e| StorageError::io(&bucket_path, e))?;
            for file in files.flatten() {
                let name = file.file_name().to_string_lossy().into_owned();
                out.push((file.path(), name));
            }
        }
        Ok(out)
    }
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(path).map_err(|e| StorageError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StorageError::io(path, e))?;
    file.sync_all().map_err(|e| StorageError::io(path, e))
}
