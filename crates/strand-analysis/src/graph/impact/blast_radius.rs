//! Change impact via inverse BFS to entry points.

use std::collections::VecDeque;

use petgraph::Direction;
use strand_core::types::{FunctionId, FxHashSet};

use super::types::ImpactReport;
use crate::call_graph::graph::CallGraph;

/// Entry points and transitive callers affected by changing `function`.
/// `None` if the function is not in the graph.
pub fn impact(graph: &CallGraph, function: FunctionId) -> Option<ImpactReport> {
    let start = graph.get_node(function)?;
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    let mut callers = Vec::new();
    let mut entry_points = Vec::new();
    let mut max_depth = 0u32;

    visited.insert(start);
    queue.push_back((start, 0u32));

    while let Some((node, depth)) = queue.pop_front() {
        if let Some(record) = graph.graph.node_weight(node) {
            if record.is_entry_point {
                entry_points.push(record.id);
            }
            if node != start {
                callers.push(record.id);
                max_depth = max_depth.max(depth);
            }
        }
        for neighbor in graph.graph.neighbors_directed(node, Direction::Incoming) {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    callers.sort_unstable();
    entry_points.sort_unstable();
    Some(ImpactReport {
        function_id: function,
        affected_entry_points: entry_points,
        transitive_callers: callers,
        max_depth,
    })
}
