//! The call graph: functions as nodes, resolved call sites as edges.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use strand_core::types::{CallSiteId, FunctionId, FxHashMap, Symbol};

use super::types::{FunctionRecord, ResolutionEdge, ResolutionRule};

/// Weight of a call edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallEdge {
    pub call_site: CallSiteId,
    pub rule: ResolutionRule,
    pub confidence: f64,
    pub line: u32,
}

pub struct CallGraph {
    /// The underlying petgraph StableGraph. Indices survive removals.
    pub graph: StableGraph<FunctionRecord, CallEdge, Directed>,
    node_index: FxHashMap<FunctionId, NodeIndex>,
    file_nodes: FxHashMap<Symbol, Vec<NodeIndex>>,
    edge_index: FxHashMap<CallSiteId, EdgeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_index: FxHashMap::default(),
            file_nodes: FxHashMap::default(),
            edge_index: FxHashMap::default(),
        }
    }

    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get_node(&self, id: FunctionId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionRecord> {
        self.get_node(id).and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn get_file_nodes(&self, file: Symbol) -> &[NodeIndex] {
        self.file_nodes.get(&file).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Add a function node; adding an existing id returns its node.
    pub fn add_function(&mut self, record: FunctionRecord) -> NodeIndex {
        if let Some(&existing) = self.node_index.get(&record.id) {
            return existing;
        }
        let (id, file) = (record.id, record.file);
        let idx = self.graph.add_node(record);
        self.node_index.insert(id, idx);
        self.file_nodes.entry(file).or_default().push(idx);
        idx
    }

    /// Add the edge for a resolved call site. Unresolved edges and edges
    /// whose endpoints are missing are ignored. Re-adding a call site
    /// replaces its edge.
    pub fn add_edge(&mut self, edge: &ResolutionEdge) -> Option<EdgeIndex> {
        let callee = edge.callee?;
        let rule = edge.rule?;
        let from = self.get_node(edge.call_site.caller)?;
        let to = self.get_node(callee)?;
        self.remove_edge(edge.call_site.id);
        let idx = self.graph.add_edge(
            from,
            to,
            CallEdge {
                call_site: edge.call_site.id,
                rule,
                confidence: edge.confidence,
                line: edge.call_site.line,
            },
        );
        self.edge_index.insert(edge.call_site.id, idx);
        Some(idx)
    }

    pub fn remove_edge(&mut self, call_site: CallSiteId) -> bool {
        match self.edge_index.remove(&call_site) {
            Some(idx) => self.graph.remove_edge(idx).is_some(),
            None => false,
        }
    }

    /// Remove all nodes of `file` and every edge touching them.
    pub fn remove_file(&mut self, file: Symbol) -> usize {
        let Some(nodes) = self.file_nodes.remove(&file) else {
            return 0;
        };
        for &idx in &nodes {
            let incident: Vec<CallSiteId> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .chain(self.graph.edges_directed(idx, Direction::Incoming))
                .map(|e| e.weight().call_site)
                .collect();
            for site in incident {
                self.edge_index.remove(&site);
            }
            if let Some(record) = self.graph.remove_node(idx) {
                self.node_index.remove(&record.id);
            }
        }
        nodes.len()
    }

    /// Distinct direct callees of `id`, sorted.
    pub fn callees(&self, id: FunctionId) -> Vec<FunctionId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Distinct direct callers of `id`, sorted.
    pub fn callers(&self, id: FunctionId) -> Vec<FunctionId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: FunctionId, direction: Direction) -> Vec<FunctionId> {
        let Some(idx) = self.get_node(id) else {
            return Vec::new();
        };
        let mut out: Vec<FunctionId> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).map(|r| r.id))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Every entry point, sorted by id.
    pub fn entry_points(&self) -> Vec<FunctionId> {
        let mut out: Vec<FunctionId> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .filter(|r| r.is_entry_point)
            .map(|r| r.id)
            .collect();
        out.sort_unstable();
        out
    }

    /// Every function id, sorted.
    pub fn function_ids(&self) -> Vec<FunctionId> {
        let mut out: Vec<FunctionId> = self.node_index.keys().copied().collect();
        out.sort_unstable();
        out
    }

    /// (call site, caller, callee) for every edge, sorted. Two graphs with
    /// equal edge lists are the same graph regardless of build history.
    pub fn edge_list(&self) -> Vec<(CallSiteId, FunctionId, FunctionId)> {
        let mut out: Vec<_> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let from = self.graph.node_weight(e.source())?.id;
                let to = self.graph.node_weight(e.target())?.id;
                Some((e.weight().call_site, from, to))
            })
            .collect();
        out.sort_unstable();
        out
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallGraph")
            .field("functions", &self.function_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
