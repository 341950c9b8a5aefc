//! Resolution index configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INDEX_MEMORY_BUDGET, DEFAULT_LOOKUP_CACHE_ENTRIES};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexConfig {
    /// Resident bytes allowed before the index spills to disk. Default: 64 MiB.
    pub memory_budget_bytes: Option<u64>,
    /// Names cached in front of the spilled store. Default: 10_000.
    pub lookup_cache_entries: Option<u64>,
    /// Persist the index next to the shards after a run. Default: true.
    pub persist: Option<bool>,
}

impl IndexConfig {
    pub fn effective_memory_budget(&self) -> u64 {
        self.memory_budget_bytes.unwrap_or(DEFAULT_INDEX_MEMORY_BUDGET)
    }

    pub fn effective_lookup_cache_entries(&self) -> u64 {
        self.lookup_cache_entries
            .unwrap_or(DEFAULT_LOOKUP_CACHE_ENTRIES)
    }

    pub fn effective_persist(&self) -> bool {
        self.persist.unwrap_or(true)
    }
}
