//! Queries over an assembled call graph.

pub mod impact;
pub mod reachability;

use std::collections::BTreeSet;

use strand_core::types::{FunctionId, SymbolInterner};

use crate::call_graph::graph::CallGraph;
use impact::{DeadCodeAllowlist, DeadCodeResult, ImpactReport};
use reachability::{Exposure, SecurityAnnotations};

/// Read-only query surface bound to one graph.
pub struct GraphQueries<'a> {
    graph: &'a CallGraph,
    interner: &'a SymbolInterner,
    resolution_rate: Option<f64>,
    low_resolution_threshold: f64,
}

impl<'a> GraphQueries<'a> {
    pub fn new(
        graph: &'a CallGraph,
        interner: &'a SymbolInterner,
        resolution_rate: Option<f64>,
        low_resolution_threshold: f64,
    ) -> Self {
        Self {
            graph,
            interner,
            resolution_rate,
            low_resolution_threshold,
        }
    }

    pub fn graph(&self) -> &'a CallGraph {
        self.graph
    }

    /// Functions reachable from `entries`, entries included.
    pub fn forward_reachable(&self, entries: &[FunctionId]) -> BTreeSet<FunctionId> {
        reachability::forward_reachable(self.graph, entries)
            .into_iter()
            .collect()
    }

    /// Entry points that reach `function`.
    pub fn inverse_reachable(&self, function: FunctionId) -> BTreeSet<FunctionId> {
        reachability::inverse_reachable(self.graph, function)
            .into_iter()
            .collect()
    }

    pub fn dead_code(&self, allowlist: &DeadCodeAllowlist) -> Vec<DeadCodeResult> {
        impact::detect_dead_code(
            self.graph,
            self.interner,
            allowlist,
            self.resolution_rate,
            self.low_resolution_threshold,
        )
    }

    pub fn impact(&self, function: FunctionId) -> Option<ImpactReport> {
        impact::impact(self.graph, function)
    }

    pub fn unauthenticated_exposures(&self, annotations: &SecurityAnnotations) -> Vec<Exposure> {
        reachability::unauthenticated_exposures(self.graph, annotations)
    }
}
