//! Sources of per-file syntax.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strand_core::errors::ScanError;
use strand_core::types::interning::normalize_path;
use xxhash_rust::xxh3::xxh3_64;

use super::types::{FileDescriptor, FileSyntax};

/// Lists input files and loads their syntax on demand.
///
/// `list` failing is fatal for a run. `load` failing affects only that file,
/// which is recorded as failed and retried on the next run.
pub trait SyntaxProvider: Send + Sync {
    fn list(&self) -> Result<Vec<FileDescriptor>, ScanError>;

    fn load(&self, file: &FileDescriptor) -> Result<FileSyntax, ScanError>;
}

/// In-memory provider, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: BTreeMap<String, (FileDescriptor, FileSyntax)>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file. The content hash is derived from the syntax
    /// itself, so changing the syntax changes the hash.
    pub fn add_file(&mut self, path: &str, language: &str, syntax: FileSyntax) -> FileDescriptor {
        let hash = serde_json::to_vec(&syntax)
            .map(|bytes| xxh3_64(&bytes))
            .unwrap_or_default();
        self.insert(FileDescriptor::new(path, language, hash), syntax)
    }

    /// Add or replace a file under an explicit descriptor.
    pub fn insert(&mut self, mut descriptor: FileDescriptor, syntax: FileSyntax) -> FileDescriptor {
        descriptor.path = normalize_path(&descriptor.path);
        self.files
            .insert(descriptor.path.clone(), (descriptor.clone(), syntax));
        descriptor
    }

    pub fn remove(&mut self, path: &str) -> Option<FileDescriptor> {
        self.files.remove(&normalize_path(path)).map(|(d, _)| d)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SyntaxProvider for MemoryProvider {
    fn list(&self) -> Result<Vec<FileDescriptor>, ScanError> {
        Ok(self.files.values().map(|(d, _)| d.clone()).collect())
    }

    fn load(&self, file: &FileDescriptor) -> Result<FileSyntax, ScanError> {
        self.files
            .get(&normalize_path(&file.path))
            .map(|(_, syntax)| syntax.clone())
            .ok_or_else(|| ScanError::SyntaxUnreadable {
                path: file.path.clone(),
                message: "not present in provider".to_string(),
            })
    }
}

const INDEX_FILE: &str = "files.json";

#[derive(Debug, Deserialize)]
struct IndexEntry {
    path: String,
    language: String,
    content_hash: u64,
    document: PathBuf,
}

/// Reads syntax documents exported by an external parser.
///
/// Layout: `<root>/files.json` is an array of
/// `{ path, language, content_hash, document }` where `document` is a
/// JSON-encoded [`FileSyntax`] relative to `root`.
#[derive(Debug)]
pub struct JsonDirProvider {
    root: PathBuf,
    files: Vec<FileDescriptor>,
    documents: BTreeMap<String, PathBuf>,
}

impl JsonDirProvider {
    pub fn open(root: &Path) -> Result<Self, ScanError> {
        let index_path = root.join(INDEX_FILE);
        let bytes = fs::read(&index_path).map_err(|source| ScanError::RootUnreadable {
            path: index_path.clone(),
            source,
        })?;
        let entries: Vec<IndexEntry> =
            serde_json::from_slice(&bytes).map_err(|e| ScanError::RootUnreadable {
                path: index_path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;

        let mut files = Vec::with_capacity(entries.len());
        let mut documents = BTreeMap::new();
        for entry in entries {
            let path = normalize_path(&entry.path);
            documents.insert(path.clone(), entry.document);
            files.push(FileDescriptor::new(path, entry.language, entry.content_hash));
        }
        tracing::debug!(root = %root.display(), files = files.len(), "opened syntax directory");
        Ok(Self {
            root: root.to_path_buf(),
            files,
            documents,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SyntaxProvider for JsonDirProvider {
    fn list(&self) -> Result<Vec<FileDescriptor>, ScanError> {
        Ok(self.files.clone())
    }

    fn load(&self, file: &FileDescriptor) -> Result<FileSyntax, ScanError> {
        let unreadable = |message: String| ScanError::SyntaxUnreadable {
            path: file.path.clone(),
            message,
        };
        let document = self
            .documents
            .get(&normalize_path(&file.path))
            .ok_or_else(|| unreadable("no syntax document listed".to_string()))?;
        let bytes = fs::read(self.root.join(document)).map_err(|e| unreadable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| unreadable(e.to_string()))
    }
}
