//! Iterative BFS. No recursion, so depth is bounded only by graph size.

use std::collections::VecDeque;

use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use strand_core::types::{FunctionId, FxHashSet};

use crate::call_graph::graph::CallGraph;

use super::types::{ReachabilityResult, TraversalDirection};

/// Every function reachable from any of `entries`, including the entries
/// themselves. Unknown ids are ignored.
pub fn forward_reachable(graph: &CallGraph, entries: &[FunctionId]) -> FxHashSet<FunctionId> {
    let starts: Vec<NodeIndex> = entries.iter().filter_map(|id| graph.get_node(*id)).collect();
    let (visited, _) = bfs_collect(graph, &starts, Direction::Outgoing, None);
    to_ids(graph, &visited)
}

/// Entry points from which `function` is reachable. An entry point
/// reaches itself. Empty for unknown ids.
pub fn inverse_reachable(graph: &CallGraph, function: FunctionId) -> FxHashSet<FunctionId> {
    let Some(start) = graph.get_node(function) else {
        return FxHashSet::default();
    };
    let (visited, _) = bfs_collect(graph, &[start], Direction::Incoming, None);
    visited
        .into_iter()
        .filter_map(|idx| graph.graph.node_weight(idx))
        .filter(|r| r.is_entry_point)
        .map(|r| r.id)
        .collect()
}

/// Single-source traversal with an optional depth limit. `None` if
/// `start` is not in the graph.
pub fn reachable_from(
    graph: &CallGraph,
    start: FunctionId,
    direction: TraversalDirection,
    max_depth: Option<u32>,
) -> Option<ReachabilityResult> {
    let idx = graph.get_node(start)?;
    let dir = match direction {
        TraversalDirection::Forward => Direction::Outgoing,
        TraversalDirection::Inverse => Direction::Incoming,
    };
    let (mut visited, depth) = bfs_collect(graph, &[idx], dir, max_depth);
    visited.remove(&idx);
    Some(ReachabilityResult {
        source: start,
        reachable: to_ids(graph, &visited),
        max_depth: depth,
    })
}

/// Multi-source BFS. Returns the visited set (sources included) and the
/// deepest level reached.
pub(crate) fn bfs_collect(
    graph: &CallGraph,
    starts: &[NodeIndex],
    direction: Direction,
    max_depth: Option<u32>,
) -> (FxHashSet<NodeIndex>, u32) {
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    let mut deepest = 0u32;

    for &start in starts {
        if visited.insert(start) {
            queue.push_back((start, 0u32));
        }
    }

    while let Some((node, depth)) = queue.pop_front() {
        deepest = deepest.max(depth);
        if let Some(max) = max_depth {
            if depth >= max {
                continue;
            }
        }

        for neighbor in graph.graph.neighbors_directed(node, direction) {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    (visited, deepest)
}

fn to_ids(graph: &CallGraph, nodes: &FxHashSet<NodeIndex>) -> FxHashSet<FunctionId> {
    nodes
        .iter()
        .filter_map(|idx| graph.graph.node_weight(*idx).map(|r| r.id))
        .collect()
}
