//! A call graph held across runs over one shard store.
//!
//! `build` assembles everything from the current shard set; `update`
//! patches the live graph for the files whose content hash changed since
//! the last successful run. Only one session may write a store at a time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use strand_core::config::StrandConfig;
use strand_core::constants::INDEX_DB_FILE;
use strand_core::errors::{CallGraphError, PipelineError, ScanError, StorageError};
use strand_core::tracing::metrics;
use strand_core::traits::CancellationToken;
use strand_core::types::interning::normalize_path;
use strand_core::types::{CallSiteId, FunctionId, FxHashMap, FxHashSet, Symbol, SymbolInterner};
use strand_storage::{IndexStore, Manifest, ManifestDiff, ManifestEntry, ShardKey, ShardStore, StoreLock};

use super::assembler::{apply_patch, assemble, GraphPatch};
use super::builder::{BuildOutcome, StreamingBuilder};
use super::edges::EdgeSet;
use super::graph::CallGraph;
use super::index::{ResolutionIndex, SpillTarget};
use super::resolution::{CallResolver, ResolutionDiagnostics, ResolutionPolicy};
use super::shard::from_record;
use super::summary::{IndexSource, RunSummary};
use super::types::{CallSite, FunctionRecord, Shard};
use crate::graph::impact::DeadCodeAllowlist;
use crate::graph::GraphQueries;
use crate::syntax::{FileDescriptor, SyntaxProvider};

/// Outcome of an incremental update.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub summary: RunSummary,
    pub diff: ManifestDiff,
    /// Every call site resolved by this update, sorted.
    pub re_resolved: Vec<CallSiteId>,
    /// Sites whose caller is in a changed file.
    pub caller_sites: usize,
    /// Sites elsewhere whose previous callee was in a changed file.
    pub dependent_sites: usize,
}

/// How the index for a run was obtained, and which files still need to be
/// absorbed into it. `refresh == None` means every shard.
struct IndexPlan {
    index: ResolutionIndex,
    source: IndexSource,
    refresh: Option<FxHashSet<String>>,
}

pub struct CallGraphSession {
    config: StrandConfig,
    store: ShardStore,
    interner: Arc<SymbolInterner>,
    index: ResolutionIndex,
    functions: FxHashMap<FunctionId, FunctionRecord>,
    file_functions: FxHashMap<Symbol, Vec<FunctionId>>,
    edges: EdgeSet,
    graph: CallGraph,
    diagnostics: ResolutionDiagnostics,
    /// Manifest of the run the live graph reflects.
    manifest: Option<Manifest>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for CallGraphSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallGraphSession")
            .field("store", &self.store.root())
            .field("functions", &self.functions.len())
            .field("edges", &self.edges.len())
            .field("built", &self.manifest.is_some())
            .finish()
    }
}

impl CallGraphSession {
    /// Open a session over the shard store at `shard_dir`.
    pub fn open(shard_dir: &Path, config: StrandConfig) -> Result<Self, PipelineError> {
        StrandConfig::validate(&config)?;
        let store = ShardStore::open(shard_dir)?;
        let interner = Arc::new(SymbolInterner::new());
        let index = ResolutionIndex::new(Arc::clone(&interner), &config.index, SpillTarget::Scratch);
        Ok(Self {
            config,
            store,
            interner,
            index,
            functions: FxHashMap::default(),
            file_functions: FxHashMap::default(),
            edges: EdgeSet::new(),
            graph: CallGraph::new(),
            diagnostics: ResolutionDiagnostics::new(),
            manifest: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Open a session for a project root, placing the shard store where
    /// `build.shard_dir` says (relative paths resolve against `root`).
    pub fn from_root(root: &Path, config: StrandConfig) -> Result<Self, PipelineError> {
        let shard_dir = config.build.effective_shard_dir();
        let shard_dir = if shard_dir.is_absolute() {
            shard_dir
        } else {
            root.join(shard_dir)
        };
        Self::open(&shard_dir, config)
    }

    /// Full run: extract what changed on disk, then index, resolve, and
    /// assemble the whole shard set.
    pub fn build(&mut self, provider: &dyn SyntaxProvider) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let mut lock = StoreLock::open(self.store.root())?;
        let _guard = lock.try_exclusive()?;

        let files = list_files(provider)?;
        let previous = Manifest::load(self.store.root())?;
        let outcome = self.run_builder(&files, provider)?;
        let manifest = outcome.manifest;

        let source = self
            .assemble_all(previous.as_ref(), &manifest)
            .inspect_err(|e| self.reset(e))?;
        let summary = self.summarize(&manifest, source, start.elapsed());
        self.manifest = Some(manifest);
        summary.log(self.config.resolution.effective_low_resolution_warning());
        Ok(summary)
    }

    /// Incremental run. Re-resolves only call sites whose caller is in a
    /// changed file, plus call sites elsewhere whose resolved callee was in
    /// one. Falls back to `build` when nothing has been built yet.
    pub fn update(&mut self, provider: &dyn SyntaxProvider) -> Result<UpdateReport, PipelineError> {
        let Some(previous) = self.manifest.clone() else {
            let summary = self.build(provider)?;
            let diff = match &self.manifest {
                Some(m) => m.diff(&Manifest::default()),
                None => ManifestDiff::default(),
            };
            let re_resolved: Vec<CallSiteId> = self.edges.sorted().iter().map(|e| e.call_site.id).collect();
            return Ok(UpdateReport {
                summary,
                caller_sites: re_resolved.len(),
                dependent_sites: 0,
                re_resolved,
                diff,
            });
        };

        let start = Instant::now();
        let mut lock = StoreLock::open(self.store.root())?;
        let _guard = lock.try_exclusive()?;

        let files = list_files(provider)?;
        let outcome = self.run_builder(&files, provider)?;
        let manifest = outcome.manifest;
        let diff = manifest.diff(&previous);

        let (sites, caller_sites, dependent_sites) =
            self.patch(&manifest, &diff).inspect_err(|e| self.reset(e))?;
        let summary = self.summarize(&manifest, IndexSource::Reloaded, start.elapsed());
        self.manifest = Some(manifest);

        let re_resolved: Vec<CallSiteId> = sites.iter().map(|s| s.id).collect();
        tracing::info!(
            { metrics::RE_RESOLVED_CALL_SITES } = re_resolved.len(),
            caller_sites,
            dependent_sites,
            changed_files = diff.changed().len(),
            "incremental update applied"
        );
        summary.log(self.config.resolution.effective_low_resolution_warning());
        Ok(UpdateReport {
            summary,
            diff,
            re_resolved,
            caller_sites,
            dependent_sites,
        })
    }

    pub fn graph(&self) -> &CallGraph {
        &self.graph
    }

    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    pub fn index(&self) -> &ResolutionIndex {
        &self.index
    }

    pub fn interner(&self) -> &SymbolInterner {
        &self.interner
    }

    pub fn config(&self) -> &StrandConfig {
        &self.config
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn diagnostics(&self) -> &ResolutionDiagnostics {
        &self.diagnostics
    }

    /// Query surface over the live graph, calibrated with the current
    /// resolution rate.
    pub fn queries(&self) -> GraphQueries<'_> {
        GraphQueries::new(
            &self.graph,
            &self.interner,
            Some(self.diagnostics.resolution_rate()),
            self.config.dead_code.effective_low_resolution_threshold(),
        )
    }

    /// Allowlist built from `dead_code.allow_patterns`.
    pub fn default_allowlist(&self) -> DeadCodeAllowlist {
        DeadCodeAllowlist::from_config(&self.config.dead_code)
    }

    /// Token observed by the builder. Cancelling it stops the current run;
    /// call `reset` on it before the next one.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionRecord> {
        self.functions.get(&id)
    }

    /// Look a function up by file and qualified name.
    pub fn function_by_name(&self, file: &str, qualified_name: &str) -> Option<&FunctionRecord> {
        let file = self.interner.get_path(file)?;
        self.file_functions
            .get(&file)?
            .iter()
            .filter_map(|id| self.functions.get(id))
            .find(|f| self.interner.resolve(f.qualified_name) == qualified_name)
    }

    /// Index, resolve, and assemble every shard `manifest` names, replacing
    /// the live state.
    fn assemble_all(
        &mut self,
        previous: Option<&Manifest>,
        manifest: &Manifest,
    ) -> Result<IndexSource, PipelineError> {
        // Release any handle on the persisted index before reopening it.
        self.index = self.scratch_index();
        let IndexPlan {
            mut index,
            source,
            refresh,
        } = self.open_index(previous, manifest)?;

        self.functions.clear();
        self.file_functions.clear();
        self.edges = EdgeSet::new();

        let mut sites = Vec::new();
        for entry in manifest.with_shards() {
            let shard = self.read_shard(entry).map_err(|e| rebuild_error(source, e.into()))?;
            let absorb = refresh.as_ref().map_or(true, |files| files.contains(&entry.file));
            if absorb {
                index.absorb(&shard).map_err(|e| rebuild_error(source, e.into()))?;
            }
            self.register(&shard, &mut sites);
        }
        sites.sort_by_key(|s| s.id);

        let policy = ResolutionPolicy::from_config(&self.config.resolution);
        let resolved = CallResolver::new(&index, &self.interner, policy).resolve_all(&sites, &self.functions)?;
        for edge in resolved {
            let file = self.caller_file(edge.caller())?;
            self.edges.insert(edge, file);
        }
        self.graph = assemble(self.functions.values(), self.edges.iter());
        self.diagnostics = self.diagnose();

        self.index = index;
        self.finish_run(manifest)?;
        Ok(source)
    }

    /// Replace the changed files' functions, re-resolve the affected call
    /// sites, and patch the graph. Returns the re-resolved sites plus the
    /// caller and dependent counts.
    fn patch(
        &mut self,
        manifest: &Manifest,
        diff: &ManifestDiff,
    ) -> Result<(Vec<CallSite>, usize, usize), PipelineError> {
        let changed: Vec<Symbol> = diff
            .changed()
            .iter()
            .map(|f| self.interner.intern_path(f))
            .collect();
        let mut removed_ids: Vec<FunctionId> = Vec::new();
        for &file in &changed {
            for id in self.file_functions.remove(&file).unwrap_or_default() {
                self.functions.remove(&id);
                removed_ids.push(id);
            }
            self.index.invalidate_file(file)?;
            self.edges.remove_caller_file(file);
        }

        // Sites in changed files are already gone, so what remains lives
        // in unchanged files.
        let dependent: Vec<CallSite> = self
            .edges
            .sites_calling_into(&removed_ids)
            .into_iter()
            .filter_map(|id| self.edges.get(id).map(|e| e.call_site))
            .collect();

        let refresh: BTreeSet<&str> = diff
            .added
            .iter()
            .chain(&diff.modified)
            .map(String::as_str)
            .collect();
        let mut new_functions: Vec<FunctionRecord> = Vec::new();
        let mut sites = Vec::new();
        for entry in manifest.with_shards().filter(|e| refresh.contains(e.file.as_str())) {
            let shard = self.read_shard(entry)?;
            self.index.absorb(&shard)?;
            new_functions.extend(shard.functions.iter().copied());
            self.register(&shard, &mut sites);
        }
        let caller_sites = sites.len();
        let dependent_sites = dependent.len();
        sites.extend(dependent);
        sites.sort_by_key(|s| s.id);

        let policy = ResolutionPolicy::from_config(&self.config.resolution);
        let resolved =
            CallResolver::new(&self.index, &self.interner, policy).resolve_all(&sites, &self.functions)?;
        for edge in &resolved {
            let file = self.caller_file(edge.caller())?;
            self.edges.insert(edge.clone(), file);
        }

        apply_patch(
            &mut self.graph,
            GraphPatch {
                removed_files: changed,
                added_functions: new_functions.iter().collect(),
                removed_edges: Vec::new(),
                edges: resolved.iter().collect(),
            },
        );
        self.diagnostics = self.diagnose();

        self.finish_run(manifest)?;
        Ok((sites, caller_sites, dependent_sites))
    }

    /// Drop live state that a failed run left half-applied. The session
    /// reads as unbuilt, so the next `update` falls back to `build`.
    fn reset(&mut self, error: &PipelineError) {
        tracing::warn!(error = %error, "run failed after touching the live graph; discarding it");
        self.index = self.scratch_index();
        self.functions.clear();
        self.file_functions.clear();
        self.edges = EdgeSet::new();
        self.graph = CallGraph::new();
        self.diagnostics = ResolutionDiagnostics::new();
        self.manifest = None;
    }

    fn run_builder(
        &self,
        files: &[FileDescriptor],
        provider: &dyn SyntaxProvider,
    ) -> Result<BuildOutcome, PipelineError> {
        let builder = StreamingBuilder::new(
            &self.store,
            &self.interner,
            self.config.build.effective_workers(),
            self.config.build.effective_queue_depth(),
            self.cancel.clone(),
        );
        let outcome = builder.build(files, provider)?;
        if outcome.manifest.cancelled {
            outcome.manifest.save(self.store.root())?;
            return Err(PipelineError::Cancelled {
                completed: outcome.completed(),
                total: files.len(),
            });
        }
        Ok(outcome)
    }

    fn index_path(&self) -> PathBuf {
        self.store.root().join(INDEX_DB_FILE)
    }

    fn scratch_index(&self) -> ResolutionIndex {
        ResolutionIndex::new(Arc::clone(&self.interner), &self.config.index, SpillTarget::Scratch)
    }

    /// Reload the persisted index when it was sealed for the previous
    /// manifest, otherwise start over. A store that exists but fails its
    /// integrity check is rebuilt from shards.
    fn open_index(&self, previous: Option<&Manifest>, manifest: &Manifest) -> Result<IndexPlan, CallGraphError> {
        let config = &self.config.index;
        if !config.effective_persist() {
            return Ok(IndexPlan {
                index: self.scratch_index(),
                source: IndexSource::Fresh,
                refresh: None,
            });
        }

        let path = self.index_path();
        let fresh = |source| IndexPlan {
            index: ResolutionIndex::new(Arc::clone(&self.interner), config, SpillTarget::File(path.clone())),
            source,
            refresh: None,
        };
        let Some(previous) = previous.filter(|m| !m.cancelled) else {
            return Ok(fresh(IndexSource::Fresh));
        };
        if !path.is_file() {
            return Ok(fresh(IndexSource::Fresh));
        }

        match IndexStore::open_verified(&path, previous.fingerprint()) {
            Ok(store) => {
                let mut index = ResolutionIndex::from_store(Arc::clone(&self.interner), config, store)?;
                let diff = manifest.diff(previous);
                for file in &diff.removed {
                    index.invalidate_file(self.interner.intern_path(file))?;
                }
                let refresh = diff.added.into_iter().chain(diff.modified).collect();
                tracing::debug!(path = %path.display(), "reloaded persisted index");
                Ok(IndexPlan {
                    index,
                    source: IndexSource::Reloaded,
                    refresh: Some(refresh),
                })
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "persisted index failed its integrity check; rebuilding from shards");
                discard_index(&path)?;
                Ok(fresh(IndexSource::Rebuilt))
            }
        }
    }

    fn read_shard(&self, entry: &ManifestEntry) -> Result<Shard, StorageError> {
        let key = entry.shard_key();
        let record = self.store.read(&key)?.ok_or_else(|| StorageError::CorruptShard {
            path: self.store.path_for(&key).display().to_string(),
            message: "shard listed in the manifest is missing".to_string(),
        })?;
        from_record(&record, &self.interner)
    }

    fn register(&mut self, shard: &Shard, sites: &mut Vec<CallSite>) {
        if shard.functions.is_empty() {
            return;
        }
        let ids = self.file_functions.entry(shard.file).or_default();
        for function in &shard.functions {
            self.functions.insert(function.id, *function);
            ids.push(function.id);
        }
        sites.extend(shard.calls.iter().copied());
    }

    fn caller_file(&self, caller: FunctionId) -> Result<Symbol, CallGraphError> {
        self.functions
            .get(&caller)
            .map(|f| f.file)
            .ok_or_else(|| CallGraphError::UnknownFunction {
                id: caller.to_string(),
            })
    }

    fn diagnose(&self) -> ResolutionDiagnostics {
        let mut diagnostics = ResolutionDiagnostics::new();
        for edge in self.edges.sorted() {
            if let Some(caller) = self.functions.get(&edge.caller()) {
                diagnostics.record(edge, caller.language);
            }
        }
        diagnostics
    }

    /// Seal the index, save the manifest, and drop shards no longer named.
    fn finish_run(&mut self, manifest: &Manifest) -> Result<(), PipelineError> {
        if self.config.index.effective_persist() {
            self.index.persist(manifest.fingerprint())?;
        }
        manifest.save(self.store.root())?;
        let live: FxHashSet<ShardKey> = manifest.with_shards().map(ManifestEntry::shard_key).collect();
        self.store.retain(|key| live.contains(key))?;
        Ok(())
    }

    fn summarize(&self, manifest: &Manifest, source: IndexSource, duration: Duration) -> RunSummary {
        use strand_storage::ShardStatus;
        RunSummary {
            files_total: manifest.entries.len(),
            files_processed: manifest.count(ShardStatus::Extracted),
            files_skipped: manifest.count(ShardStatus::Reused),
            files_failed: manifest.count(ShardStatus::Failed),
            functions: self.functions.len(),
            call_sites: self.edges.len(),
            graph_edges: self.graph.edge_count(),
            resolution: self.diagnostics.clone(),
            index_source: source,
            index_spilled: self.index.spill_count() > 0,
            duration,
        }
    }
}

/// List the input set, rejecting two descriptors for one normalized path.
fn list_files(provider: &dyn SyntaxProvider) -> Result<Vec<FileDescriptor>, ScanError> {
    let files = provider.list()?;
    let mut seen = BTreeSet::new();
    for file in &files {
        let path = normalize_path(&file.path);
        if !seen.insert(path.clone()) {
            return Err(ScanError::DuplicateFile { path });
        }
    }
    Ok(files)
}

/// Delete a damaged index database along with its WAL sidecars.
fn discard_index(path: &Path) -> Result<(), CallGraphError> {
    for suffix in ["", "-wal", "-shm"] {
        let mut target = path.as_os_str().to_owned();
        target.push(suffix);
        let target = PathBuf::from(target);
        match std::fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CallGraphError::RebuildFailed {
                    message: format!("cannot remove {}: {e}", target.display()),
                })
            }
        }
    }
    Ok(())
}

fn rebuild_error(source: IndexSource, error: PipelineError) -> PipelineError {
    match source {
        IndexSource::Rebuilt => CallGraphError::RebuildFailed {
            message: error.to_string(),
        }
        .into(),
        _ => error,
    }
}
