//! Resolution index: short name to candidate definitions.
//!
//! Entries live in memory until the estimated footprint crosses the
//! configured budget, then move to a SQLite store. Lookups merge both tiers
//! and always return candidates sorted by function id, so resolution does
//! not depend on where an entry happens to live. A moka cache fronts the
//! disk tier for hot names.

use std::mem::size_of;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use moka::sync::Cache;
use strand_core::config::IndexConfig;
use strand_core::errors::{CallGraphError, StorageError};
use strand_core::tracing::metrics;
use strand_core::types::collections::SmallVec4;
use strand_core::types::{FunctionId, FxHashMap, FxHashSet, Symbol, SymbolInterner};
use strand_storage::{IndexRow, IndexStore};

use super::types::{IndexEntry, Shard};
use crate::language::Language;

/// Approximate resident cost of one entry: the entry itself plus its
/// back-reference in the per-file index and map overhead.
const ENTRY_FOOTPRINT: usize =
    size_of::<IndexEntry>() + size_of::<(Symbol, FunctionId)>() + 2 * size_of::<usize>();

/// Where entries go once the memory budget is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpillTarget {
    /// A temporary database removed when the index is dropped.
    Scratch,
    /// A persistent database that can be sealed and reloaded next run.
    File(PathBuf),
}

pub struct ResolutionIndex {
    interner: Arc<SymbolInterner>,
    memory: FxHashMap<Symbol, SmallVec4<IndexEntry>>,
    /// file -> (short name, id) of its in-memory entries.
    file_index: FxHashMap<Symbol, Vec<(Symbol, FunctionId)>>,
    resident_entries: usize,
    budget_bytes: u64,
    spill_target: SpillTarget,
    disk: Option<Mutex<IndexStore>>,
    disk_files: FxHashSet<Symbol>,
    cache: Cache<Symbol, Arc<Vec<IndexEntry>>>,
    spills: usize,
}

impl std::fmt::Debug for ResolutionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionIndex")
            .field("resident_entries", &self.resident_entries)
            .field("budget_bytes", &self.budget_bytes)
            .field("spilled", &self.is_spilled())
            .field("spill_target", &self.spill_target)
            .finish()
    }
}

impl ResolutionIndex {
    /// An empty index. A `File` target is truncated on first spill.
    pub fn new(interner: Arc<SymbolInterner>, config: &IndexConfig, spill_target: SpillTarget) -> Self {
        Self {
            interner,
            memory: FxHashMap::default(),
            file_index: FxHashMap::default(),
            resident_entries: 0,
            budget_bytes: config.effective_memory_budget(),
            spill_target,
            disk: None,
            disk_files: FxHashSet::default(),
            cache: Cache::new(config.effective_lookup_cache_entries()),
            spills: 0,
        }
    }

    /// Wrap a verified persisted store. All entries start on disk.
    pub fn from_store(
        interner: Arc<SymbolInterner>,
        config: &IndexConfig,
        store: IndexStore,
    ) -> Result<Self, CallGraphError> {
        let spill_target = match store.path() {
            Some(p) => SpillTarget::File(p.to_path_buf()),
            None => SpillTarget::Scratch,
        };
        let files = store
            .files()
            .map_err(|source| CallGraphError::SpillFailed { source })?;
        let disk_files = files.iter().map(|f| interner.intern_path(f)).collect();

        let mut index = Self::new(interner, config, spill_target);
        index.disk = Some(Mutex::new(store));
        index.disk_files = disk_files;
        Ok(index)
    }

    /// Add a shard's definitions, replacing any earlier entries for its file.
    pub fn absorb(&mut self, shard: &Shard) -> Result<(), CallGraphError> {
        self.invalidate_file(shard.file)?;
        if shard.functions.is_empty() {
            return Ok(());
        }

        let refs = self.file_index.entry(shard.file).or_default();
        for function in &shard.functions {
            self.memory
                .entry(function.short_name)
                .or_default()
                .push(IndexEntry::from_record(function));
            refs.push((function.short_name, function.id));
        }
        self.resident_entries += shard.functions.len();

        if self.resident_bytes() > self.budget_bytes {
            self.spill()?;
        }
        Ok(())
    }

    /// Drop every entry contributed by `file`. Returns the number removed.
    pub fn invalidate_file(&mut self, file: Symbol) -> Result<usize, CallGraphError> {
        let mut removed = 0;
        if let Some(refs) = self.file_index.remove(&file) {
            for (short, id) in refs {
                if let Some(entries) = self.memory.get_mut(&short) {
                    let before = entries.len();
                    entries.retain(|e| e.function_id != id);
                    removed += before - entries.len();
                    if entries.is_empty() {
                        self.memory.remove(&short);
                    }
                }
            }
            self.resident_entries -= removed;
        }

        if self.disk_files.remove(&file) {
            let path = self.interner.resolve(file).to_string();
            let interner = Arc::clone(&self.interner);
            let store = self.disk_mut()?;
            let rows = store
                .file_rows(&path)
                .map_err(|source| CallGraphError::SpillFailed { source })?;
            removed += store
                .delete_file(&path)
                .map_err(|source| CallGraphError::SpillFailed { source })?;
            for row in rows {
                if let Some(short) = interner.get(&row.short_name) {
                    self.cache.invalidate(&short);
                }
            }
        }
        Ok(removed)
    }

    /// Candidates for `short_name`, sorted by function id.
    pub fn lookup(&self, short_name: Symbol) -> Result<Vec<IndexEntry>, CallGraphError> {
        let mut out: Vec<IndexEntry> = self
            .memory
            .get(&short_name)
            .map(|v| v.to_vec())
            .unwrap_or_default();

        if let Some(disk) = &self.disk {
            let entries = match self.cache.get(&short_name) {
                Some(hit) => hit,
                None => {
                    let loaded = Arc::new(self.load_from_disk(disk, short_name)?);
                    self.cache.insert(short_name, Arc::clone(&loaded));
                    loaded
                }
            };
            out.extend(entries.iter().copied());
        }

        out.sort_by_key(|e| e.function_id);
        out.dedup_by_key(|e| e.function_id);
        Ok(out)
    }

    pub fn candidate_count(&self, short_name: Symbol) -> Result<usize, CallGraphError> {
        Ok(self.lookup(short_name)?.len())
    }

    /// Move every in-memory entry to the disk tier.
    pub fn spill(&mut self) -> Result<(), CallGraphError> {
        if self.resident_entries == 0 && self.disk.is_some() {
            return Ok(());
        }
        let rows = self.resident_rows();
        let resident_bytes = self.resident_bytes();
        let store = self.ensure_disk()?;
        store
            .insert_batch(&rows)
            .map_err(|source| CallGraphError::SpillFailed { source })?;

        self.disk_files.extend(self.file_index.keys().copied());
        self.memory.clear();
        self.file_index.clear();
        self.resident_entries = 0;
        self.cache.invalidate_all();
        self.spills += 1;

        if self.spills == 1 {
            tracing::warn!(
                { metrics::INDEX_SPILLED } = true,
                { metrics::INDEX_RESIDENT_BYTES } = resident_bytes,
                budget_bytes = self.budget_bytes,
                "resolution index exceeded its memory budget; spilling to disk"
            );
        } else {
            tracing::debug!(entries = rows.len(), "spilled index entries");
        }
        Ok(())
    }

    /// Flush everything to the persistent store and seal it against the
    /// shard-set fingerprint. A scratch-backed index has nothing to persist.
    pub fn persist(&mut self, fingerprint: u64) -> Result<(), CallGraphError> {
        if self.spill_target == SpillTarget::Scratch {
            tracing::debug!("index persistence disabled; skipping seal");
            return Ok(());
        }
        let rows = self.resident_rows();
        let store = self.ensure_disk()?;
        store
            .insert_batch(&rows)
            .map_err(|source| CallGraphError::SpillFailed { source })?;
        store
            .seal(fingerprint)
            .map_err(|source| CallGraphError::SpillFailed { source })?;

        self.disk_files.extend(self.file_index.keys().copied());
        self.memory.clear();
        self.file_index.clear();
        self.resident_entries = 0;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Estimated bytes held by the memory tier.
    pub fn resident_bytes(&self) -> u64 {
        (self.resident_entries * ENTRY_FOOTPRINT) as u64
    }

    pub fn resident_entries(&self) -> usize {
        self.resident_entries
    }

    pub fn is_spilled(&self) -> bool {
        self.disk.is_some()
    }

    pub fn spill_count(&self) -> usize {
        self.spills
    }

    /// Total entries across both tiers.
    pub fn len(&self) -> Result<usize, CallGraphError> {
        let on_disk = match &self.disk {
            Some(disk) => lock(disk, "<len>")?
                .len()
                .map_err(|source| CallGraphError::SpillFailed { source })?,
            None => 0,
        };
        Ok(self.resident_entries + on_disk)
    }

    pub fn is_empty(&self) -> Result<bool, CallGraphError> {
        Ok(self.len()? == 0)
    }

    fn resident_rows(&self) -> Vec<IndexRow> {
        let mut rows = Vec::with_capacity(self.resident_entries);
        for (short, entries) in &self.memory {
            let short_name = self.interner.resolve(*short);
            for entry in entries {
                rows.push(IndexRow {
                    function_id: entry.function_id.value(),
                    short_name: short_name.to_string(),
                    file: self.interner.resolve(entry.file).to_string(),
                    qualified_name: self.interner.resolve(entry.qualified_name).to_string(),
                    scope: entry.scope.map(|s| self.interner.resolve(s).to_string()),
                    visibility: entry.visibility,
                    language: entry.language.name().to_string(),
                    start_line: entry.start_line,
                });
            }
        }
        rows.sort_by_key(|r| r.function_id);
        rows
    }

    fn ensure_disk(&mut self) -> Result<&mut IndexStore, CallGraphError> {
        if self.disk.is_none() {
            let store = match &self.spill_target {
                SpillTarget::Scratch => IndexStore::open_scratch(),
                SpillTarget::File(path) => IndexStore::open(path).and_then(|s| {
                    s.clear()?;
                    Ok(s)
                }),
            }
            .map_err(|source| CallGraphError::SpillFailed { source })?;
            self.disk = Some(Mutex::new(store));
        }
        self.disk_mut()
    }

    fn disk_mut(&mut self) -> Result<&mut IndexStore, CallGraphError> {
        match self.disk.as_mut() {
            Some(disk) => disk.get_mut().map_err(|_| CallGraphError::SpillFailed {
                source: StorageError::SqliteError {
                    message: "index store lock poisoned".to_string(),
                },
            }),
            None => Err(CallGraphError::SpillFailed {
                source: StorageError::SqliteError {
                    message: "index has no disk tier".to_string(),
                },
            }),
        }
    }

    fn load_from_disk(
        &self,
        disk: &Mutex<IndexStore>,
        short_name: Symbol,
    ) -> Result<Vec<IndexEntry>, CallGraphError> {
        let name = self
            .interner
            .try_resolve(short_name)
            .ok_or_else(|| CallGraphError::LookupFailed {
                name: format!("#{}", short_name.index()),
                message: "symbol not produced by this index's interner".to_string(),
            })?;
        let rows = lock(disk, name)?
            .lookup(name)
            .map_err(|e| CallGraphError::LookupFailed {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        rows.into_iter()
            .map(|row| {
                let language =
                    Language::from_tag(&row.language).ok_or_else(|| CallGraphError::LookupFailed {
                        name: name.to_string(),
                        message: format!("unknown language `{}` in index", row.language),
                    })?;
                Ok(IndexEntry {
                    function_id: FunctionId(row.function_id),
                    file: self.interner.intern_path(&row.file),
                    qualified_name: self.interner.intern(&row.qualified_name),
                    scope: row.scope.as_deref().map(|s| self.interner.intern(s)),
                    visibility: row.visibility,
                    language,
                    start_line: row.start_line,
                })
            })
            .collect()
    }
}

fn lock<'a>(disk: &'a Mutex<IndexStore>, name: &str) -> Result<MutexGuard<'a, IndexStore>, CallGraphError> {
    disk.lock().map_err(|_| CallGraphError::LookupFailed {
        name: name.to_string(),
        message: "index store lock poisoned".to_string(),
    })
}
