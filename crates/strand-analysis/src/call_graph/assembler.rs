//! Graph assembly from resolution output, full or incremental.

use strand_core::tracing::metrics;
use strand_core::types::{CallSiteId, Symbol};

use super::graph::CallGraph;
use super::types::{FunctionRecord, ResolutionEdge};

/// Build a graph from scratch. Nodes and edges are inserted in id order.
pub fn assemble<'a>(
    functions: impl IntoIterator<Item = &'a FunctionRecord>,
    edges: impl IntoIterator<Item = &'a ResolutionEdge>,
) -> CallGraph {
    let mut functions: Vec<&FunctionRecord> = functions.into_iter().collect();
    functions.sort_by_key(|f| f.id);
    let mut edges: Vec<&ResolutionEdge> = edges.into_iter().filter(|e| e.is_resolved()).collect();
    edges.sort_by_key(|e| e.call_site.id);

    let mut graph = CallGraph::new();
    for function in functions {
        graph.add_function(*function);
    }
    for edge in edges {
        graph.add_edge(edge);
    }

    tracing::info!(
        { metrics::GRAPH_FUNCTIONS } = graph.function_count(),
        { metrics::GRAPH_EDGES } = graph.edge_count(),
        "call graph assembled"
    );
    graph
}

/// Changes produced by re-extracting and re-resolving a set of files.
#[derive(Debug, Default)]
pub struct GraphPatch<'a> {
    /// Files whose nodes (and every incident edge) are dropped first.
    pub removed_files: Vec<Symbol>,
    pub added_functions: Vec<&'a FunctionRecord>,
    pub removed_edges: Vec<CallSiteId>,
    /// Replacement edges; unresolved ones only clear the old edge.
    pub edges: Vec<&'a ResolutionEdge>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub nodes_removed: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

/// Apply a patch in place: removals, then nodes, then edges.
pub fn apply_patch(graph: &mut CallGraph, patch: GraphPatch<'_>) -> PatchStats {
    let mut stats = PatchStats::default();
    for file in patch.removed_files {
        stats.nodes_removed += graph.remove_file(file);
    }
    for site in patch.removed_edges {
        graph.remove_edge(site);
    }

    let mut functions = patch.added_functions;
    functions.sort_by_key(|f| f.id);
    for function in functions {
        graph.add_function(*function);
        stats.nodes_added += 1;
    }

    let mut edges = patch.edges;
    edges.sort_by_key(|e| e.call_site.id);
    for edge in edges {
        graph.remove_edge(edge.call_site.id);
        if graph.add_edge(edge).is_some() {
            stats.edges_added += 1;
        }
    }

    tracing::debug!(
        nodes_removed = stats.nodes_removed,
        nodes_added = stats.nodes_added,
        edges_added = stats.edges_added,
        { metrics::GRAPH_FUNCTIONS } = graph.function_count(),
        { metrics::GRAPH_EDGES } = graph.edge_count(),
        "call graph patched"
    );
    stats
}
