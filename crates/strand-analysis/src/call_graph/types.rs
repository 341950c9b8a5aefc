//! Call graph types: function records, call sites, shards, resolution edges.

use serde::{Deserialize, Serialize};
use strand_core::errors::ExtractError;
use strand_core::types::collections::SmallVec4;
use strand_core::types::{CallSiteId, FunctionId, Symbol, Visibility};

use crate::language::Language;

/// A function definition, immutable once extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionRecord {
    pub id: FunctionId,
    pub qualified_name: Symbol,
    /// Last segment of the qualified name; the index key.
    pub short_name: Symbol,
    /// Qualified name minus the short name, if any.
    pub scope: Option<Symbol>,
    pub file: Symbol,
    pub language: Language,
    pub start_line: u32,
    pub end_line: u32,
    pub visibility: Visibility,
    pub is_entry_point: bool,
}

impl FunctionRecord {
    /// Whether `line` falls inside this function's span.
    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn span(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line)
    }
}

/// One call expression, attributed to its innermost enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub id: CallSiteId,
    pub caller: FunctionId,
    /// Target text as written.
    pub target: Symbol,
    /// Last segment of the target; looked up in the index.
    pub short_name: Symbol,
    /// Explicit qualifier (`Utils` in `Utils.helper`). Self-references like
    /// `this.` are stripped and leave no qualifier.
    pub qualifier: Option<Symbol>,
    pub imported_scope: Option<Symbol>,
    pub line: u32,
    pub column: u32,
}

/// The extraction output for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    pub file: Symbol,
    /// `None` when the language tag is not recognized.
    pub language: Option<Language>,
    pub language_tag: String,
    pub content_hash: u64,
    pub functions: Vec<FunctionRecord>,
    pub calls: Vec<CallSite>,
    pub error: Option<ExtractError>,
}

impl Shard {
    /// An empty shard carrying an extraction failure.
    pub fn failed(
        file: Symbol,
        language_tag: &str,
        content_hash: u64,
        error: ExtractError,
    ) -> Self {
        Self {
            file,
            language: Language::from_tag(language_tag),
            language_tag: language_tag.to_string(),
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

/// Outcome class of one resolved call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    UnresolvedAmbiguous,
    UnresolvedExternal,
}

impl ResolutionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::UnresolvedAmbiguous => "unresolved_ambiguous",
            Self::UnresolvedExternal => "unresolved_external",
        }
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rule produced a resolved edge. Rules are tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// Same file, visible from the caller's lexical scope.
    SameScope,
    /// Named by an explicit import binding.
    ImportBinding,
    /// The only definition of the name anywhere.
    UniqueName,
}

impl ResolutionRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SameScope => "same_scope",
            Self::ImportBinding => "import_binding",
            Self::UniqueName => "unique_name",
        }
    }

    pub fn all_ordered() -> &'static [ResolutionRule] {
        &[Self::SameScope, Self::ImportBinding, Self::UniqueName]
    }
}

impl std::fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The resolver's verdict for one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionEdge {
    pub call_site: CallSite,
    /// Set only when `status` is `Resolved`.
    pub callee: Option<FunctionId>,
    pub confidence: f64,
    pub status: ResolutionStatus,
    pub rule: Option<ResolutionRule>,
    /// Every candidate, sorted by id, when `status` is `UnresolvedAmbiguous`.
    pub candidates: SmallVec4<FunctionId>,
}

impl ResolutionEdge {
    pub fn resolved(
        call_site: CallSite,
        callee: FunctionId,
        rule: ResolutionRule,
        confidence: f64,
    ) -> Self {
        Self {
            call_site,
            callee: Some(callee),
            confidence,
            status: ResolutionStatus::Resolved,
            rule: Some(rule),
            candidates: SmallVec4::new(),
        }
    }

    pub fn ambiguous(call_site: CallSite, candidates: SmallVec4<FunctionId>) -> Self {
        Self {
            call_site,
            callee: None,
            confidence: 0.0,
            status: ResolutionStatus::UnresolvedAmbiguous,
            rule: None,
            candidates,
        }
    }

    pub fn external(call_site: CallSite) -> Self {
        Self {
            call_site,
            callee: None,
            confidence: 0.0,
            status: ResolutionStatus::UnresolvedExternal,
            rule: None,
            candidates: SmallVec4::new(),
        }
    }

    pub fn caller(&self) -> FunctionId {
        self.call_site.caller
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}

/// A resolution index entry. The short name is the key it is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub function_id: FunctionId,
    pub file: Symbol,
    pub qualified_name: Symbol,
    pub scope: Option<Symbol>,
    pub visibility: Visibility,
    pub language: Language,
    pub start_line: u32,
}

impl IndexEntry {
    pub fn from_record(record: &FunctionRecord) -> Self {
        Self {
            function_id: record.id,
            file: record.file,
            qualified_name: record.qualified_name,
            scope: record.scope,
            visibility: record.visibility,
            language: record.language,
            start_line: record.start_line,
        }
    }
}
