//! Streaming shard builder.
//!
//! The calling thread feeds file indices into a bounded channel; a fixed
//! rayon pool extracts and persists one shard per file and reports back a
//! manifest entry. Both channels are bounded, so at most
//! `workers * queue_depth` files are ever in flight and no shard outlives
//! its worker.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use strand_core::errors::{PipelineError, ScanError, StorageError};
use strand_core::tracing::metrics;
use strand_core::traits::{Cancellable, CancellationToken};
use strand_core::types::interning::normalize_path;
use strand_core::types::SymbolInterner;
use strand_storage::{Manifest, ManifestEntry, ShardKey, ShardStatus, ShardStore};

use super::shard::to_record;
use crate::extractors::extract_file;
use crate::syntax::{FileDescriptor, SyntaxProvider};

/// Result of one builder pass.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub duration: Duration,
}

impl BuildOutcome {
    /// Files that finished (extracted, reused, or failed) before any cancel.
    pub fn completed(&self) -> usize {
        self.manifest.entries.len() - self.manifest.count(ShardStatus::Skipped)
    }
}

pub struct StreamingBuilder<'a> {
    store: &'a ShardStore,
    interner: &'a SymbolInterner,
    workers: usize,
    queue_depth: usize,
    cancel: CancellationToken,
}

impl<'a> StreamingBuilder<'a> {
    pub fn new(
        store: &'a ShardStore,
        interner: &'a SymbolInterner,
        workers: usize,
        queue_depth: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            interner,
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
            cancel,
        }
    }

    /// Process every file. On cancellation the files not yet started are
    /// recorded as `Skipped` and the manifest is marked cancelled; every
    /// shard written before that point is complete.
    pub fn build(
        &self,
        files: &[FileDescriptor],
        provider: &dyn SyntaxProvider,
    ) -> Result<BuildOutcome, PipelineError> {
        let start = Instant::now();
        let capacity = self.workers * self.queue_depth;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("strand-extract-{i}"))
            .build()
            .map_err(|e| StorageError::Io {
                path: self.store.root().display().to_string(),
                message: format!("failed to start worker pool: {e}"),
            })?;

        let (work_tx, work_rx) = bounded::<usize>(capacity);
        let (done_tx, done_rx) = bounded::<(usize, ManifestEntry)>(capacity);

        let mut results: Vec<Option<ManifestEntry>> = vec![None; files.len()];
        pool.in_place_scope(|scope| {
            for _ in 0..self.workers {
                let rx = work_rx.clone();
                let tx = done_tx.clone();
                scope.spawn(move |_| self.worker(files, provider, rx, tx));
            }
            drop(work_rx);
            drop(done_tx);
            self.dispatch(files.len(), work_tx, &done_rx, &mut results);
        });

        let cancelled = self.cancel.is_cancelled() && results.iter().any(Option::is_none);
        let entries: Vec<ManifestEntry> = results
            .into_iter()
            .zip(files)
            .map(|(entry, file)| entry.unwrap_or_else(|| skipped_entry(file)))
            .collect();
        let manifest = Manifest::new(entries, cancelled);
        let duration = start.elapsed();

        tracing::info!(
            { metrics::FILES_PROCESSED } = manifest.count(ShardStatus::Extracted),
            { metrics::FILES_SKIPPED } = manifest.count(ShardStatus::Reused),
            { metrics::FILES_FAILED } = manifest.count(ShardStatus::Failed),
            { metrics::BUILD_DURATION_MS } = duration.as_millis() as u64,
            cancelled,
            "shard build finished"
        );
        Ok(BuildOutcome { manifest, duration })
    }

    /// Feed work while draining results, stopping early on cancellation.
    fn dispatch(
        &self,
        total: usize,
        work_tx: Sender<usize>,
        done_rx: &Receiver<(usize, ManifestEntry)>,
        results: &mut [Option<ManifestEntry>],
    ) {
        let mut next = 0;
        while next < total && !self.cancel.is_cancelled() {
            select! {
                send(work_tx, next) -> sent => match sent {
                    Ok(()) => next += 1,
                    Err(_) => break,
                },
                recv(done_rx) -> msg => if let Ok((idx, entry)) = msg {
                    results[idx] = Some(entry);
                },
            }
        }
        drop(work_tx);
        for (idx, entry) in done_rx.iter() {
            results[idx] = Some(entry);
        }
    }

    fn worker(
        &self,
        files: &[FileDescriptor],
        provider: &dyn SyntaxProvider,
        rx: Receiver<usize>,
        tx: Sender<(usize, ManifestEntry)>,
    ) {
        for idx in rx.iter() {
            if self.cancel.is_cancelled() {
                break;
            }
            let entry = self.process(&files[idx], provider);
            if tx.send((idx, entry)).is_err() {
                break;
            }
        }
    }

    fn process(&self, file: &FileDescriptor, provider: &dyn SyntaxProvider) -> ManifestEntry {
        let path = normalize_path(&file.path);
        let key = ShardKey::new(&path, file.content_hash);

        if self.store.contains(&key) {
            match self.store.read(&key) {
                Ok(Some(record)) => {
                    let status = if record.is_failed() {
                        ShardStatus::Failed
                    } else {
                        ShardStatus::Reused
                    };
                    return ManifestEntry {
                        file: path,
                        language: record.language,
                        content_hash: file.content_hash,
                        status,
                        functions: record.functions.len(),
                        calls: record.calls.len(),
                        persisted: true,
                        error: record.error,
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "re-extracting unreadable shard");
                }
            }
        }

        let syntax = match provider.load(file) {
            Ok(s) => s,
            Err(e) => return self.failed(file, path, &e, false),
        };

        let shard = extract_file(file, &syntax, self.interner);
        let record = to_record(&shard, self.interner);
        if let Err(e) = self.store.write(&record) {
            tracing::warn!(file = %path, error = %e, "failed to persist shard");
            return ManifestEntry {
                file: path,
                language: file.language.clone(),
                content_hash: file.content_hash,
                status: ShardStatus::Failed,
                functions: 0,
                calls: 0,
                persisted: false,
                error: Some(e.to_string()),
            };
        }

        ManifestEntry {
            file: path,
            language: record.language,
            content_hash: file.content_hash,
            status: if record.error.is_some() {
                ShardStatus::Failed
            } else {
                ShardStatus::Extracted
            },
            functions: record.functions.len(),
            calls: record.calls.len(),
            persisted: true,
            error: record.error,
        }
    }

    fn failed(&self, file: &FileDescriptor, path: String, error: &ScanError, persisted: bool) -> ManifestEntry {
        tracing::warn!(file = %path, error = %error, "failed to load syntax");
        ManifestEntry {
            file: path,
            language: file.language.clone(),
            content_hash: file.content_hash,
            status: ShardStatus::Failed,
            functions: 0,
            calls: 0,
            persisted,
            error: Some(error.to_string()),
        }
    }
}

fn skipped_entry(file: &FileDescriptor) -> ManifestEntry {
    ManifestEntry {
        file: normalize_path(&file.path),
        language: file.language.clone(),
        content_hash: file.content_hash,
        status: ShardStatus::Skipped,
        functions: 0,
        calls: 0,
        persisted: false,
        error: None,
    }
}
