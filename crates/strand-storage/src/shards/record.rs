//! On-disk shard layout.
//!
//! Shards hold strings rather than interner handles so that a shard
//! written by one run is byte-identical when rewritten by the next.

use serde::{Deserialize, Serialize};
use strand_core::constants::SHARD_FORMAT_VERSION;
use strand_core::types::Visibility;

/// The complete extraction output for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardRecord {
    pub format_version: u32,
    pub file: String,
    pub language: String,
    pub content_hash: u64,
    pub functions: Vec<FunctionRow>,
    pub calls: Vec<CallRow>,
    /// Set when extraction failed; `functions` and `calls` are then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRow {
    pub id: u64,
    pub qualified_name: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub visibility: Visibility,
    pub is_entry_point: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRow {
    pub id: u64,
    pub caller: u64,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_scope: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl ShardRecord {
    /// An empty shard carrying only an error marker.
    pub fn failed(file: &str, language: &str, content_hash: u64, error: String) -> Self {
        Self {
            format_version: SHARD_FORMAT_VERSION,
            file: file.to_string(),
            language: language.to_string(),
            content_hash,
            functions: Vec::new(),
            calls: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
