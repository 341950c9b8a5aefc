//! Ordered call resolution.
//!
//! Rules, first match wins:
//! 1. same file, visible from the caller's lexical scope
//! 2. an explicit import binding naming exactly one candidate
//! 3. exactly one candidate anywhere
//!
//! Two or more candidates left over is ambiguous; none is external.
//! Candidates come from the index already sorted by id, and every rule is a
//! pure function of (call site, caller, candidates), so results do not
//! depend on worker scheduling.

use rayon::prelude::*;
use strand_core::config::ResolutionConfig;
use strand_core::constants::{
    DEFAULT_IMPORT_CONFIDENCE, DEFAULT_SAME_SCOPE_CONFIDENCE, DEFAULT_UNIQUE_CONFIDENCE,
};
use strand_core::errors::CallGraphError;
use strand_core::types::collections::{BTreeMap, SmallVec4};
use strand_core::types::{FunctionId, FxHashMap, Symbol, SymbolInterner};

use super::index::ResolutionIndex;
use super::types::{
    CallSite, FunctionRecord, IndexEntry, ResolutionEdge, ResolutionRule, ResolutionStatus,
};
use crate::extractors::{extractor_for, CallGraphExtractor};
use crate::language::Language;

/// Confidence attached to each resolving rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    pub same_scope: f64,
    pub import: f64,
    pub unique: f64,
}

impl ResolutionPolicy {
    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self {
            same_scope: config.effective_same_scope_confidence(),
            import: config.effective_import_confidence(),
            unique: config.effective_unique_confidence(),
        }
    }

    pub fn confidence(&self, rule: ResolutionRule) -> f64 {
        match rule {
            ResolutionRule::SameScope => self.same_scope,
            ResolutionRule::ImportBinding => self.import,
            ResolutionRule::UniqueName => self.unique,
        }
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            same_scope: DEFAULT_SAME_SCOPE_CONFIDENCE,
            import: DEFAULT_IMPORT_CONFIDENCE,
            unique: DEFAULT_UNIQUE_CONFIDENCE,
        }
    }
}

pub struct CallResolver<'a> {
    index: &'a ResolutionIndex,
    interner: &'a SymbolInterner,
    policy: ResolutionPolicy,
}

impl<'a> CallResolver<'a> {
    pub fn new(index: &'a ResolutionIndex, interner: &'a SymbolInterner, policy: ResolutionPolicy) -> Self {
        Self {
            index,
            interner,
            policy,
        }
    }

    /// Resolve a batch in parallel. Output order matches `sites`.
    pub fn resolve_all(
        &self,
        sites: &[CallSite],
        functions: &FxHashMap<FunctionId, FunctionRecord>,
    ) -> Result<Vec<ResolutionEdge>, CallGraphError> {
        sites
            .par_iter()
            .map(|site| {
                let caller = functions
                    .get(&site.caller)
                    .ok_or_else(|| CallGraphError::UnknownFunction {
                        id: site.caller.to_string(),
                    })?;
                self.resolve(site, caller)
            })
            .collect()
    }

    pub fn resolve(&self, site: &CallSite, caller: &FunctionRecord) -> Result<ResolutionEdge, CallGraphError> {
        let Some(extractor) = extractor_for(caller.language) else {
            return Ok(ResolutionEdge::external(*site));
        };

        // Calls never cross a language family boundary.
        let family = caller.language.family();
        let candidates: Vec<IndexEntry> = self
            .index
            .lookup(site.short_name)?
            .into_iter()
            .filter(|e| e.language.family() == family)
            .collect();
        if candidates.is_empty() {
            return Ok(ResolutionEdge::external(*site));
        }

        let qualifier = site.qualifier.map(|q| self.interner.resolve(q));
        if let Some(id) = self.same_scope(caller, &candidates, qualifier, extractor) {
            return Ok(self.resolved(site, id, ResolutionRule::SameScope));
        }

        if let Some(import) = site.imported_scope {
            let import = self.interner.resolve(import);
            let caller_file = self.interner.resolve(caller.file);
            let mut bound = self
                .narrowed(&candidates, qualifier, extractor)
                .into_iter()
                .filter(|e| self.matches_import(e, import, caller_file, extractor));
            if let (Some(only), None) = (bound.next(), bound.next()) {
                return Ok(self.resolved(site, only.function_id, ResolutionRule::ImportBinding));
            }
        }

        // Rule 3 counts every same-family definition of the name; a
        // qualifier never makes a shared name unique.
        Ok(match candidates.as_slice() {
            [only] => self.resolved(site, only.function_id, ResolutionRule::UniqueName),
            many => ResolutionEdge::ambiguous(
                *site,
                many.iter().map(|e| e.function_id).collect::<SmallVec4<_>>(),
            ),
        })
    }

    /// Candidates whose scope matches the call's qualifier, or all of them
    /// when none does (`user.save()` names a variable, not a scope).
    fn narrowed(
        &self,
        candidates: &[IndexEntry],
        qualifier: Option<&str>,
        extractor: &dyn CallGraphExtractor,
    ) -> Vec<IndexEntry> {
        let Some(q) = qualifier else {
            return candidates.to_vec();
        };
        let narrowed: Vec<IndexEntry> = candidates
            .iter()
            .filter(|e| self.scope_matches(e.scope, q, extractor))
            .copied()
            .collect();
        if narrowed.is_empty() {
            candidates.to_vec()
        } else {
            narrowed
        }
    }

    fn resolved(&self, site: &CallSite, callee: FunctionId, rule: ResolutionRule) -> ResolutionEdge {
        ResolutionEdge::resolved(*site, callee, rule, self.policy.confidence(rule))
    }

    /// Rule 1. A qualified call must name a unique same-file scope; an
    /// unqualified one takes the innermost enclosing scope that defines the
    /// name, and is undecided if that scope defines it more than once.
    fn same_scope(
        &self,
        caller: &FunctionRecord,
        candidates: &[IndexEntry],
        qualifier: Option<&str>,
        extractor: &dyn CallGraphExtractor,
    ) -> Option<FunctionId> {
        let same_file: Vec<&IndexEntry> = candidates.iter().filter(|e| e.file == caller.file).collect();
        if same_file.is_empty() {
            return None;
        }

        if let Some(q) = qualifier {
            let mut matching = same_file
                .iter()
                .filter(|e| self.scope_matches(e.scope, q, extractor));
            return match (matching.next(), matching.next()) {
                (Some(only), None) => Some(only.function_id),
                _ => None,
            };
        }

        let mut level = Some(self.interner.resolve(caller.qualified_name));
        loop {
            let mut at_level = same_file
                .iter()
                .filter(|e| e.scope.map(|s| self.interner.resolve(s)) == level);
            match (at_level.next(), at_level.next()) {
                (Some(only), None) => return Some(only.function_id),
                (Some(_), Some(_)) => return None,
                _ => {}
            }
            match level {
                Some(scope) => level = extractor.split_qualified(scope).0,
                None => return None,
            }
        }
    }

    fn scope_matches(&self, scope: Option<Symbol>, qualifier: &str, extractor: &dyn CallGraphExtractor) -> bool {
        scope.is_some_and(|s| extractor.scope_ends_with(self.interner.resolve(s), qualifier))
    }

    /// An import binds a candidate when it names the candidate's scope or
    /// the module file that defines it. Relative specifiers are joined onto
    /// the caller's directory and must name that exact module.
    fn matches_import(
        &self,
        entry: &IndexEntry,
        import: &str,
        caller_file: &str,
        extractor: &dyn CallGraphExtractor,
    ) -> bool {
        let entry_file = self.interner.resolve(entry.file);
        if is_relative_specifier(import) {
            return relative_module_path(caller_file, import)
                .is_some_and(|module| module_stems(entry_file).iter().any(|stem| *stem == module));
        }
        if let Some(scope) = entry.scope {
            let scope = self.interner.resolve(scope);
            if extractor.scope_ends_with(scope, import) || extractor.scope_ends_with(import, scope) {
                return true;
            }
        }
        let module = normalize_module_path(import);
        if module.is_empty() {
            return false;
        }
        module_stems(entry_file)
            .iter()
            .any(|stem| *stem == module || stem.ends_with(&format!("/{module}")))
    }
}

fn is_relative_specifier(import: &str) -> bool {
    let import = import.trim();
    import == "." || import == ".." || import.starts_with("./") || import.starts_with("../")
}

/// Join a `./` or `../` specifier onto the directory of `caller_file`:
/// (`src/pages/home.ts`, `../lib/dates.js`) -> `src/lib/dates`. `None` when
/// the specifier climbs above the project root.
pub fn relative_module_path(caller_file: &str, import: &str) -> Option<String> {
    let mut parts: Vec<&str> = caller_file.split('/').collect();
    parts.pop();
    parts.retain(|p| !p.is_empty() && *p != ".");

    for segment in import.trim().split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    let mut module = parts.join("/");
    if let Some(len) = SOURCE_EXTENSIONS
        .iter()
        .find_map(|ext| module.strip_suffix(ext).map(str::len))
    {
        module.truncate(len);
    }
    if module.is_empty() {
        None
    } else {
        Some(module)
    }
}

const SOURCE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs", ".py", ".java", ".kt", ".cs",
    ".go", ".rs", ".rb", ".php", ".cpp", ".cc", ".cxx", ".hpp", ".h", ".c",
];

/// Reduce an import specifier to a slash-separated module path:
/// `./lib/utils.js` -> `lib/utils`, `app.services.auth` -> `app/services/auth`,
/// `crate::storage::open` -> `storage/open`.
pub fn normalize_module_path(source: &str) -> String {
    let mut s = source.trim();
    loop {
        let before = s;
        for prefix in ["./", "../", "@/", "~/", "crate::", "super::", "self::", "\\"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest;
            }
        }
        if s == before {
            break;
        }
    }
    for ext in SOURCE_EXTENSIONS {
        if let Some(stem) = s.strip_suffix(ext) {
            s = stem;
            break;
        }
    }
    let mut out = s.replace("::", "/").replace('\\', "/");
    if !out.contains('/') {
        out = out.replace('.', "/");
    }
    out.trim_matches('/').to_string()
}

/// The module paths a file answers to: its path without extension, plus the
/// directory for package index files (`index.ts`, `__init__.py`, `mod.rs`).
fn module_stems(file: &str) -> Vec<&str> {
    let stem = match file.rsplit_once('.') {
        Some((head, ext)) if !ext.contains('/') && !head.is_empty() && !head.ends_with('/') => head,
        _ => file,
    };
    let mut stems = vec![stem];
    for index_name in ["/index", "/__init__", "/mod"] {
        if let Some(dir) = stem.strip_suffix(index_name) {
            stems.push(dir);
        }
    }
    stems
}

/// Per-rule and per-language resolution counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionDiagnostics {
    pub total_call_sites: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub external: usize,
    pub by_rule: BTreeMap<&'static str, usize>,
    /// language -> (resolved, total)
    pub by_language: BTreeMap<&'static str, (usize, usize)>,
}

impl ResolutionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, edge: &ResolutionEdge, language: Language) {
        self.total_call_sites += 1;
        let lang_entry = self.by_language.entry(language.name()).or_insert((0, 0));
        lang_entry.1 += 1;

        match edge.status {
            ResolutionStatus::Resolved => {
                self.resolved += 1;
                lang_entry.0 += 1;
                if let Some(rule) = edge.rule {
                    *self.by_rule.entry(rule.name()).or_default() += 1;
                }
            }
            ResolutionStatus::UnresolvedAmbiguous => self.ambiguous += 1,
            ResolutionStatus::UnresolvedExternal => self.external += 1,
        }
    }

    pub fn count(&self, status: ResolutionStatus) -> usize {
        match status {
            ResolutionStatus::Resolved => self.resolved,
            ResolutionStatus::UnresolvedAmbiguous => self.ambiguous,
            ResolutionStatus::UnresolvedExternal => self.external,
        }
    }

    /// Fraction of call sites with the given status. Zero when there are none.
    pub fn rate(&self, status: ResolutionStatus) -> f64 {
        if self.total_call_sites == 0 {
            0.0
        } else {
            self.count(status) as f64 / self.total_call_sites as f64
        }
    }

    pub fn resolution_rate(&self) -> f64 {
        self.rate(ResolutionStatus::Resolved)
    }

    pub fn low_resolution_warnings(&self, threshold: f64) -> Vec<String> {
        let mut warnings = Vec::new();
        for (lang, (resolved, total)) in &self.by_language {
            if *total > 0 {
                let rate = *resolved as f64 / *total as f64;
                if rate < threshold {
                    warnings.push(format!(
                        "Low resolution rate for {}: {:.1}% ({}/{})",
                        lang,
                        rate * 100.0,
                        resolved,
                        total
                    ));
                }
            }
        }
        warnings
    }
}
