//! Streaming builder configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_QUEUE_DEPTH, DEFAULT_SHARD_DIR, DEFAULT_WORKERS};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker threads. 0 = available parallelism. Default: 0.
    pub workers: Option<usize>,
    /// Files allowed in flight per worker before the producer blocks. Default: 2.
    pub queue_depth: Option<usize>,
    /// Shard store directory. Relative paths resolve against the project root.
    pub shard_dir: Option<PathBuf>,
}

impl BuildConfig {
    /// Worker count with `0` mapped to the machine's available parallelism.
    pub fn effective_workers(&self) -> usize {
        match self.workers.unwrap_or(DEFAULT_WORKERS) {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    pub fn effective_queue_depth(&self) -> usize {
        self.queue_depth.unwrap_or(DEFAULT_QUEUE_DEPTH).max(1)
    }

    pub fn effective_shard_dir(&self) -> PathBuf {
        self.shard_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SHARD_DIR))
    }
}
