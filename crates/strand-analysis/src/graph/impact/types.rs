//! Impact analysis types.

use serde::{Deserialize, Serialize};
use strand_core::types::FunctionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadCodeReason {
    /// Nothing calls the function.
    NoCallers,
    /// Called, but only from functions no entry point reaches.
    NoEntryPath,
}

impl DeadCodeReason {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoCallers => "no_callers",
            Self::NoEntryPath => "no_entry_path",
        }
    }
}

impl std::fmt::Display for DeadCodeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A function no entry point can reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadCodeResult {
    pub function_id: FunctionId,
    pub reason: DeadCodeReason,
    /// How sure the verdict is, 0.0 - 1.0. Drops when too few call
    /// sites resolved for a missing edge to mean much.
    pub confidence: f32,
}

/// Which entry points a change to one function can affect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub function_id: FunctionId,
    /// Entry points that reach the function, sorted. Includes the function
    /// itself if it is an entry point.
    pub affected_entry_points: Vec<FunctionId>,
    /// Every transitive caller, sorted.
    pub transitive_callers: Vec<FunctionId>,
    /// Length of the longest shortest caller chain.
    pub max_depth: u32,
}
