//! Call resolution policy. The confidence values are defaults, not guarantees.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_IMPORT_CONFIDENCE, DEFAULT_LOW_RESOLUTION_WARNING, DEFAULT_SAME_SCOPE_CONFIDENCE,
    DEFAULT_UNIQUE_CONFIDENCE,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Same file and lexical scope. Default: 1.0.
    pub same_scope_confidence: Option<f64>,
    /// Explicit import binding. Default: 0.9.
    pub import_confidence: Option<f64>,
    /// Single candidate in the whole index. Default: 0.75.
    pub unique_confidence: Option<f64>,
    /// Per-language resolution rate that triggers a warning. Default: 0.30.
    pub low_resolution_warning: Option<f64>,
}

impl ResolutionConfig {
    pub fn effective_same_scope_confidence(&self) -> f64 {
        self.same_scope_confidence
            .unwrap_or(DEFAULT_SAME_SCOPE_CONFIDENCE)
    }

    pub fn effective_import_confidence(&self) -> f64 {
        self.import_confidence.unwrap_or(DEFAULT_IMPORT_CONFIDENCE)
    }

    pub fn effective_unique_confidence(&self) -> f64 {
        self.unique_confidence.unwrap_or(DEFAULT_UNIQUE_CONFIDENCE)
    }

    pub fn effective_low_resolution_warning(&self) -> f64 {
        self.low_resolution_warning
            .unwrap_or(DEFAULT_LOW_RESOLUTION_WARNING)
    }
}
