//! Run manifest: one entry per input file with its shard status.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strand_core::constants::MANIFEST_FILE;
use strand_core::errors::StorageError;
use xxhash_rust::xxh3::Xxh3;

use crate::shards::ShardKey;

/// What happened to a file's shard in the run that produced the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStatus {
    /// Extracted this run and persisted.
    Extracted,
    /// An identical shard already existed and was reused.
    Reused,
    /// Extraction or loading failed; the file contributes an empty shard.
    Failed,
    /// Not processed because the run was cancelled first.
    Skipped,
}

impl ShardStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Reused => "reused",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub language: String,
    pub content_hash: u64,
    pub status: ShardStatus,
    pub functions: usize,
    pub calls: usize,
    /// Whether the failure was written to disk as an empty shard. Load
    /// failures are not, so the next run retries them.
    #[serde(default)]
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManifestEntry {
    pub fn shard_key(&self) -> ShardKey {
        ShardKey::new(&self.file, self.content_hash)
    }

    /// Whether a shard for this entry exists on disk.
    pub fn has_shard(&self) -> bool {
        match self.status {
            ShardStatus::Extracted | ShardStatus::Reused => true,
            ShardStatus::Failed => self.persisted,
            ShardStatus::Skipped => false,
        }
    }
}

/// Manifest of a (possibly partial) run, sorted by file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    #[serde(default)]
    pub cancelled: bool,
}

/// Files grouped by how they changed between two manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ManifestDiff {
    /// Added, modified, and removed files, sorted.
    pub fn changed(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .cloned()
            .collect();
        out.sort();
        out
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

impl Manifest {
    pub fn new(mut entries: Vec<ManifestEntry>, cancelled: bool) -> Self {
        entries.sort_by(|a, b| a.file.cmp(&b.file));
        Self { entries, cancelled }
    }

    pub fn get(&self, file: &str) -> Option<&ManifestEntry> {
        self.entries
            .binary_search_by(|e| e.file.as_str().cmp(file))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn count(&self, status: ShardStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Entries backed by a shard on disk.
    pub fn with_shards(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.has_shard())
    }

    /// Hash over (file, content hash) of every entry with a shard. Ties a
    /// persisted index to the exact shard set it was built from.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for entry in self.with_shards() {
            hasher.update(entry.file.as_bytes());
            hasher.update(&[0]);
            hasher.update(&entry.content_hash.to_le_bytes());
        }
        hasher.digest()
    }

    /// Compare against the manifest of a previous run.
    pub fn diff(&self, previous: &Manifest) -> ManifestDiff {
        let before: BTreeMap<&str, u64> = previous
            .with_shards()
            .map(|e| (e.file.as_str(), e.content_hash))
            .collect();
        let after: BTreeMap<&str, u64> = self
            .with_shards()
            .map(|e| (e.file.as_str(), e.content_hash))
            .collect();

        let mut diff = ManifestDiff::default();
        for (file, hash) in &after {
            match before.get(file) {
                None => diff.added.push(file.to_string()),
                Some(old) if old != hash => diff.modified.push(file.to_string()),
                Some(_) => diff.unchanged.push(file.to_string()),
            }
        }
        for file in before.keys() {
            if !after.contains_key(file) {
                diff.removed.push(file.to_string());
            }
        }
        diff
    }

    /// Load `manifest.json` from `dir`. A missing or unreadable manifest is
    /// `Ok(None)`: it only costs a full rebuild.
    pub fn load(dir: &Path) -> Result<Option<Manifest>, StorageError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable manifest");
                Ok(None)
            }
        }
    }

    /// Write `manifest.json` into `dir` atomically.
    pub fn save(&self, dir: &Path) -> Result<(), StorageError> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.{}.tmp", std::process::id()));
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serialization {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut file = fs::File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| StorageError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))
    }
}
