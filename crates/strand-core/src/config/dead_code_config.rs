//! Dead-code detection configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DEAD_CODE_LOW_RESOLUTION;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeadCodeConfig {
    /// Glob patterns over qualified names that are never reported (e.g. `test_*`).
    #[serde(default)]
    pub allow_patterns: Vec<String>,
    /// Resolution rate below which dead-code confidence drops. Default: 0.40.
    pub low_resolution_threshold: Option<f64>,
}

impl DeadCodeConfig {
    pub fn effective_low_resolution_threshold(&self) -> f64 {
        self.low_resolution_threshold
            .unwrap_or(DEFAULT_DEAD_CODE_LOW_RESOLUTION)
    }
}
