//! Per-run summary.

use std::time::Duration;

use strand_core::tracing::metrics;

use super::resolution::ResolutionDiagnostics;
use super::types::ResolutionStatus;

/// How the resolution index was obtained for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSource {
    /// Built from shards; nothing was persisted before.
    #[default]
    Fresh,
    /// A persisted index passed its integrity check and was patched.
    Reloaded,
    /// A persisted index failed its integrity check and was rebuilt.
    Rebuilt,
}

impl IndexSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Reloaded => "reloaded",
            Self::Rebuilt => "rebuilt",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files_total: usize,
    /// Extracted this run.
    pub files_processed: usize,
    /// Unchanged since the shard was written; reused.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub functions: usize,
    pub call_sites: usize,
    pub graph_edges: usize,
    pub resolution: ResolutionDiagnostics,
    pub index_source: IndexSource,
    pub index_spilled: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn rate(&self, status: ResolutionStatus) -> f64 {
        self.resolution.rate(status)
    }

    pub fn resolution_rate(&self) -> f64 {
        self.resolution.resolution_rate()
    }

    /// Emit the summary as one structured event plus any per-language
    /// low-resolution warnings.
    pub fn log(&self, low_resolution_warning: f64) {
        tracing::info!(
            files_total = self.files_total,
            { metrics::FILES_PROCESSED } = self.files_processed,
            { metrics::FILES_SKIPPED } = self.files_skipped,
            { metrics::FILES_FAILED } = self.files_failed,
            functions = self.functions,
            call_sites = self.call_sites,
            { metrics::GRAPH_EDGES } = self.graph_edges,
            { metrics::RESOLUTION_RATE } = self.resolution_rate(),
            ambiguous_rate = self.rate(ResolutionStatus::UnresolvedAmbiguous),
            external_rate = self.rate(ResolutionStatus::UnresolvedExternal),
            index = self.index_source.name(),
            { metrics::INDEX_SPILLED } = self.index_spilled,
            duration_ms = self.duration.as_millis() as u64,
            "call graph run complete"
        );
        for warning in self.resolution.low_resolution_warnings(low_resolution_warning) {
            tracing::warn!("{warning}");
        }
    }
}
