//! The resolved edge set, keyed by call site.

use strand_core::types::{CallSiteId, FunctionId, FxHashMap, FxHashSet, Symbol};

use super::types::{ResolutionEdge, ResolutionStatus};

/// One edge per call site, with reverse lookups by caller file and by
/// resolved callee for incremental invalidation.
#[derive(Debug, Default, Clone)]
pub struct EdgeSet {
    edges: FxHashMap<CallSiteId, ResolutionEdge>,
    by_caller_file: FxHashMap<Symbol, Vec<CallSiteId>>,
    by_callee: FxHashMap<FunctionId, FxHashSet<CallSiteId>>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the edge for a call site. Returns the previous edge.
    pub fn insert(&mut self, edge: ResolutionEdge, caller_file: Symbol) -> Option<ResolutionEdge> {
        let id = edge.call_site.id;
        let previous = self.edges.remove(&id);
        match &previous {
            Some(old) => self.unlink_callee(old),
            None => self.by_caller_file.entry(caller_file).or_default().push(id),
        }
        if let Some(callee) = edge.callee {
            self.by_callee.entry(callee).or_default().insert(id);
        }
        self.edges.insert(id, edge);
        previous
    }

    /// Remove every edge whose caller lives in `file`.
    pub fn remove_caller_file(&mut self, file: Symbol) -> Vec<ResolutionEdge> {
        let Some(ids) = self.by_caller_file.remove(&file) else {
            return Vec::new();
        };
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(edge) = self.edges.remove(&id) {
                self.unlink_callee(&edge);
                removed.push(edge);
            }
        }
        removed
    }

    /// Call sites currently resolved to any of `callees`, sorted.
    pub fn sites_calling_into<'a>(&self, callees: impl IntoIterator<Item = &'a FunctionId>) -> Vec<CallSiteId> {
        let mut out: Vec<CallSiteId> = callees
            .into_iter()
            .filter_map(|c| self.by_callee.get(c))
            .flat_map(|ids| ids.iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn get(&self, id: CallSiteId) -> Option<&ResolutionEdge> {
        self.edges.get(&id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionEdge> {
        self.edges.values()
    }

    /// All edges ordered by call site id.
    pub fn sorted(&self) -> Vec<&ResolutionEdge> {
        let mut out: Vec<&ResolutionEdge> = self.edges.values().collect();
        out.sort_by_key(|e| e.call_site.id);
        out
    }

    pub fn count(&self, status: ResolutionStatus) -> usize {
        self.edges.values().filter(|e| e.status == status).count()
    }

    fn unlink_callee(&mut self, edge: &ResolutionEdge) {
        let Some(callee) = edge.callee else { return };
        if let Some(sites) = self.by_callee.get_mut(&callee) {
            sites.remove(&edge.call_site.id);
            if sites.is_empty() {
                self.by_callee.remove(&callee);
            }
        }
    }
}
