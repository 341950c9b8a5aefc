//! Reachability result types.

use strand_core::types::{FunctionId, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalDirection {
    /// Follow calls from caller to callee.
    Forward,
    /// Follow calls from callee back to caller.
    Inverse,
}

impl TraversalDirection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
        }
    }
}

/// Result of a single-source traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityResult {
    pub source: FunctionId,
    /// Every function reached, excluding the source.
    pub reachable: FxHashSet<FunctionId>,
    /// Deepest BFS level reached.
    pub max_depth: u32,
}
