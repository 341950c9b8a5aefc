//! Sensitive functions reachable from unauthenticated entry points.

use std::collections::VecDeque;

use glob::Pattern;
use strand_core::types::{FunctionId, FxHashMap, FxHashSet, SymbolInterner};

use crate::call_graph::graph::CallGraph;

/// Which functions are sensitive and which entry points authenticate.
#[derive(Debug, Clone, Default)]
pub struct SecurityAnnotations {
    pub sensitive: FxHashSet<FunctionId>,
    pub authenticated: FxHashSet<FunctionId>,
}

impl SecurityAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_sensitive(&mut self, id: FunctionId) -> &mut Self {
        self.sensitive.insert(id);
        self
    }

    pub fn mark_authenticated(&mut self, id: FunctionId) -> &mut Self {
        self.authenticated.insert(id);
        self
    }

    /// Annotate by glob over qualified names (`*.delete*`, `Admin.*`).
    pub fn from_patterns(
        graph: &CallGraph,
        interner: &SymbolInterner,
        sensitive: &[Pattern],
        authenticated: &[Pattern],
    ) -> Self {
        let mut annotations = Self::default();
        for id in graph.function_ids() {
            let Some(record) = graph.function(id) else { continue };
            let name = interner.resolve(record.qualified_name);
            if sensitive.iter().any(|p| p.matches(name)) {
                annotations.sensitive.insert(id);
            }
            if authenticated.iter().any(|p| p.matches(name)) {
                annotations.authenticated.insert(id);
            }
        }
        annotations
    }
}

/// A sensitive function and the shortest call path that reaches it from an
/// unauthenticated entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposure {
    pub entry_point: FunctionId,
    pub sensitive: FunctionId,
    /// Entry point first, sensitive function last.
    pub path: Vec<FunctionId>,
}

/// Every (unauthenticated entry point, sensitive function) pair connected
/// by calls, sorted by entry point then sensitive function.
pub fn unauthenticated_exposures(graph: &CallGraph, annotations: &SecurityAnnotations) -> Vec<Exposure> {
    if annotations.sensitive.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for entry in graph.entry_points() {
        if annotations.authenticated.contains(&entry) {
            continue;
        }

        let mut parent: FxHashMap<FunctionId, FunctionId> = FxHashMap::default();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(entry);
        queue.push_back(entry);

        let mut found = Vec::new();
        while let Some(current) = queue.pop_front() {
            if annotations.sensitive.contains(&current) {
                found.push(current);
            }
            for callee in graph.callees(current) {
                if visited.insert(callee) {
                    parent.insert(callee, current);
                    queue.push_back(callee);
                }
            }
        }

        found.sort_unstable();
        for sensitive in found {
            let mut path = vec![sensitive];
            let mut cursor = sensitive;
            while let Some(&prev) = parent.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            out.push(Exposure {
                entry_point: entry,
                sensitive,
                path,
            });
        }
    }
    out
}
