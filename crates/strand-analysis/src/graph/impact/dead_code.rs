//! Dead code: functions whose inverse-reachable entry point set is empty.

use glob::Pattern;
use petgraph::Direction;
use strand_core::config::DeadCodeConfig;
use strand_core::types::{FunctionId, FxHashSet, SymbolInterner};

use super::types::{DeadCodeReason, DeadCodeResult};
use crate::call_graph::graph::CallGraph;
use crate::call_graph::types::FunctionRecord;
use crate::graph::reachability::bfs::bfs_collect;

/// Confidence applied to every finding when the resolution rate is low.
const LOW_RESOLUTION_CONFIDENCE: f32 = 0.3;

/// Functions that are never reported, by id or by glob over qualified name.
#[derive(Debug, Clone, Default)]
pub struct DeadCodeAllowlist {
    ids: FxHashSet<FunctionId>,
    patterns: Vec<Pattern>,
}

impl DeadCodeAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns from config. Invalid patterns are rejected at config load,
    /// so any that slip through here are skipped.
    pub fn from_config(config: &DeadCodeConfig) -> Self {
        let mut allowlist = Self::new();
        for pattern in &config.allow_patterns {
            match Pattern::new(pattern) {
                Ok(p) => allowlist.patterns.push(p),
                Err(e) => tracing::warn!(pattern = %pattern, error = %e, "skipping invalid allow pattern"),
            }
        }
        allowlist
    }

    pub fn allow_id(mut self, id: FunctionId) -> Self {
        self.ids.insert(id);
        self
    }

    pub fn allow_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn extend(&mut self, other: &DeadCodeAllowlist) {
        self.ids.extend(other.ids.iter().copied());
        self.patterns.extend(other.patterns.iter().cloned());
    }

    pub fn allows(&self, record: &FunctionRecord, interner: &SymbolInterner) -> bool {
        if self.ids.contains(&record.id) {
            return true;
        }
        if self.patterns.is_empty() {
            return false;
        }
        let qualified = interner.resolve(record.qualified_name);
        let short = interner.resolve(record.short_name);
        self.patterns
            .iter()
            .any(|p| p.matches(qualified) || p.matches(short))
    }
}

/// Every function no entry point reaches, minus the allowlist, sorted by id.
///
/// `resolution_rate` below `low_resolution_threshold` drops every
/// finding's confidence: with most calls unresolved, "no caller" is weak
/// evidence.
pub fn detect_dead_code(
    graph: &CallGraph,
    interner: &SymbolInterner,
    allowlist: &DeadCodeAllowlist,
    resolution_rate: Option<f64>,
    low_resolution_threshold: f64,
) -> Vec<DeadCodeResult> {
    let low_resolution = resolution_rate
        .map(|r| r < low_resolution_threshold)
        .unwrap_or(false);

    let entries: Vec<_> = graph
        .entry_points()
        .into_iter()
        .filter_map(|id| graph.get_node(id))
        .collect();
    let (live, _) = bfs_collect(graph, &entries, Direction::Outgoing, None);

    let mut results: Vec<DeadCodeResult> = graph
        .graph
        .node_indices()
        .filter(|idx| !live.contains(idx))
        .filter_map(|idx| {
            let record = graph.graph.node_weight(idx)?;
            if allowlist.allows(record, interner) {
                return None;
            }
            let has_callers = graph
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .is_some();
            let reason = if has_callers {
                DeadCodeReason::NoEntryPath
            } else {
                DeadCodeReason::NoCallers
            };
            let confidence = if low_resolution {
                LOW_RESOLUTION_CONFIDENCE
            } else {
                dead_code_confidence(record, reason, interner)
            };
            Some(DeadCodeResult {
                function_id: record.id,
                reason,
                confidence,
            })
        })
        .collect();
    results.sort_by_key(|r| r.function_id);
    results
}

fn dead_code_confidence(record: &FunctionRecord, reason: DeadCodeReason, interner: &SymbolInterner) -> f32 {
    let mut confidence = match reason {
        DeadCodeReason::NoCallers => 0.9f32,
        DeadCodeReason::NoEntryPath => 0.8,
    };
    // Short and handler-like names are often called dynamically.
    let name = interner.resolve(record.short_name).to_lowercase();
    if name.len() <= 3 {
        confidence -= 0.15;
    }
    if ["handler", "callback", "listener", "hook", "middleware"]
        .iter()
        .any(|n| name.contains(n))
    {
        confidence -= 0.2;
    }
    confidence.clamp(0.1, 1.0)
}
