//! Per-language call graph extractors.
//!
//! Each supported language has one extractor that turns a file's syntax into
//! a [`Shard`]. The shared algorithm lives in the trait's provided methods.
//! A language implementation supplies its name separators, self-reference
//! keywords, entry-point conventions, and visibility rules.

pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod typescript;

use strand_core::constants::MODULE_FUNCTION_NAME;
use strand_core::errors::ExtractError;
use strand_core::types::collections::FxHashSet;
use strand_core::types::{CallSiteId, FunctionId, SymbolInterner, Visibility};

use crate::call_graph::types::{CallSite, FunctionRecord, Shard};
use crate::language::Language;
use crate::syntax::{FileDescriptor, FileSyntax, FunctionDecl};

/// Extracts function definitions and call sites for one language.
pub trait CallGraphExtractor: Send + Sync {
    fn language(&self) -> Language;

    /// Separators between segments of a qualified name.
    fn scope_separators(&self) -> &'static [&'static str];

    /// Receivers that refer to the enclosing scope (`this`, `self`).
    fn receiver_keywords(&self) -> &'static [&'static str] {
        &[]
    }

    /// Entry points the language defines by convention (`main`), on top of
    /// whatever the parser flagged.
    fn is_conventional_entry_point(&self, _short_name: &str, _scope: Option<&str>) -> bool {
        false
    }

    fn effective_visibility(&self, decl: &FunctionDecl, _short_name: &str) -> Visibility {
        decl.visibility
    }

    /// Split a qualified name at its last separator into (scope, short name).
    fn split_qualified<'a>(&self, name: &'a str) -> (Option<&'a str>, &'a str) {
        let mut best: Option<(usize, usize)> = None;
        for sep in self.scope_separators() {
            if let Some(idx) = name.rfind(sep) {
                let end = idx + sep.len();
                if best.map_or(true, |(_, b)| end > b) {
                    best = Some((idx, end));
                }
            }
        }
        match best {
            Some((idx, end)) if idx > 0 && end < name.len() => (Some(&name[..idx]), &name[end..]),
            _ => (None, name),
        }
    }

    /// Split a call target into (qualifier, short name), dropping a
    /// qualifier that only names the enclosing scope.
    fn split_target<'a>(&self, target: &'a str) -> (Option<&'a str>, &'a str) {
        match self.split_qualified(target) {
            (Some(q), short) if self.receiver_keywords().contains(&q) => (None, short),
            other => other,
        }
    }

    /// Whether `scope` is `qualifier` or ends with it at a segment boundary.
    fn scope_ends_with(&self, scope: &str, qualifier: &str) -> bool {
        if scope == qualifier {
            return true;
        }
        match scope.strip_suffix(qualifier) {
            Some(head) => self.scope_separators().iter().any(|sep| head.ends_with(sep)),
            None => false,
        }
    }

    /// Validate declarations and build function records.
    fn extract_functions(
        &self,
        file: &FileDescriptor,
        syntax: &FileSyntax,
        interner: &SymbolInterner,
    ) -> Result<Vec<FunctionRecord>, ExtractError> {
        let file_sym = interner.intern_path(&file.path);
        let file_name = interner.resolve(file_sym);
        let malformed = |message: String| ExtractError::Malformed {
            path: file_name.to_string(),
            message,
        };

        let mut seen: FxHashSet<(&str, u32)> = FxHashSet::default();
        let mut functions = Vec::with_capacity(syntax.functions.len());
        for decl in &syntax.functions {
            let name = decl.qualified_name.as_str();
            if name.trim().is_empty() {
                return Err(malformed("function with empty name".to_string()));
            }
            if name == MODULE_FUNCTION_NAME {
                return Err(malformed(format!("`{name}` is reserved")));
            }
            if decl.start_line == 0 {
                return Err(malformed(format!("function `{name}` starts at line 0")));
            }
            if decl.end_line < decl.start_line {
                return Err(malformed(format!(
                    "function `{name}` ends before it starts ({}..{})",
                    decl.start_line, decl.end_line
                )));
            }
            if !seen.insert((name, decl.start_line)) {
                return Err(malformed(format!(
                    "duplicate function `{name}` at line {}",
                    decl.start_line
                )));
            }

            let (scope, short) = self.split_qualified(name);
            functions.push(FunctionRecord {
                id: FunctionId::derive(file_name, name, decl.start_line),
                qualified_name: interner.intern(name),
                short_name: interner.intern(short),
                scope: scope.map(|s| interner.intern(s)),
                file: file_sym,
                language: self.language(),
                start_line: decl.start_line,
                end_line: decl.end_line,
                visibility: self.effective_visibility(decl, short),
                is_entry_point: decl.is_entry_point || self.is_conventional_entry_point(short, scope),
            });
        }
        Ok(functions)
    }

    /// Attribute each call to its innermost enclosing function. Calls
    /// outside every function go to a synthetic module-level entry point,
    /// appended to `functions` when first needed.
    fn extract_calls(
        &self,
        file: &FileDescriptor,
        syntax: &FileSyntax,
        functions: &mut Vec<FunctionRecord>,
        interner: &SymbolInterner,
    ) -> Result<Vec<CallSite>, ExtractError> {
        let file_sym = interner.intern_path(&file.path);
        let file_name = interner.resolve(file_sym);
        let declared = functions.len();

        let mut module_fn: Option<FunctionRecord> = None;
        let mut seen: FxHashSet<CallSiteId> = FxHashSet::default();
        let mut calls = Vec::with_capacity(syntax.calls.len());
        for call in &syntax.calls {
            let target = call.target_name.trim();
            if target.is_empty() {
                return Err(ExtractError::Malformed {
                    path: file_name.to_string(),
                    message: format!("call with empty target at line {}", call.line),
                });
            }
            if call.line == 0 {
                return Err(ExtractError::Malformed {
                    path: file_name.to_string(),
                    message: format!("call to `{target}` at line 0"),
                });
            }

            let caller = match innermost_enclosing(&functions[..declared], call.line) {
                Some(f) => f.id,
                None => {
                    module_fn
                        .get_or_insert_with(|| module_function(file_name, file_sym, self.language(), interner))
                        .id
                }
            };

            let id = CallSiteId::derive(caller, target, call.line, call.column);
            if !seen.insert(id) {
                continue;
            }
            let (qualifier, short) = self.split_target(target);
            calls.push(CallSite {
                id,
                caller,
                target: interner.intern(target),
                short_name: interner.intern(short),
                qualifier: qualifier.map(|q| interner.intern(q)),
                imported_scope: call
                    .imported_scope
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| interner.intern(s)),
                line: call.line,
                column: call.column,
            });
        }

        if let Some(m) = module_fn {
            functions.push(m);
        }
        Ok(calls)
    }

    /// Run both extraction passes. Malformed input yields an empty shard
    /// carrying the error.
    fn extract(&self, file: &FileDescriptor, syntax: &FileSyntax, interner: &SymbolInterner) -> Shard {
        let file_sym = interner.intern_path(&file.path);
        let result = self.extract_functions(file, syntax, interner).and_then(|mut functions| {
            let calls = self.extract_calls(file, syntax, &mut functions, interner)?;
            Ok((functions, calls))
        });
        match result {
            Ok((functions, calls)) => Shard {
                file: file_sym,
                language: Some(self.language()),
                language_tag: self.language().name().to_string(),
                content_hash: file.content_hash,
                functions,
                calls,
                error: None,
            },
            Err(e) => {
                tracing::warn!(file = %file.path, error = %e, "extraction failed");
                Shard::failed(file_sym, self.language().name(), file.content_hash, e)
            }
        }
    }
}

/// The extractor for `language`, or `None` if the language has none.
pub fn extractor_for(language: Language) -> Option<&'static dyn CallGraphExtractor> {
    match language {
        Language::TypeScript => Some(&typescript::TYPESCRIPT),
        Language::JavaScript => Some(&typescript::JAVASCRIPT),
        Language::Python => Some(&python::PythonExtractor),
        Language::Java => Some(&java::JAVA),
        Language::Kotlin => Some(&java::KOTLIN),
        Language::CSharp => Some(&csharp::CSharpExtractor),
        Language::Go => Some(&go::GoExtractor),
        Language::Rust => Some(&rust::RustExtractor),
        Language::Ruby => Some(&ruby::RubyExtractor),
        Language::Php => Some(&php::PhpExtractor),
        Language::Cpp => Some(&cpp::CPP),
        Language::C => Some(&cpp::C),
        Language::Swift | Language::Scala => None,
    }
}

/// Extract one file, dispatching on its language tag. Unknown or
/// unsupported languages produce an empty shard with an error.
pub fn extract_file(file: &FileDescriptor, syntax: &FileSyntax, interner: &SymbolInterner) -> Shard {
    let language = Language::from_tag(&file.language);
    match language.and_then(extractor_for) {
        Some(extractor) => extractor.extract(file, syntax, interner),
        None => {
            let file_sym = interner.intern_path(&file.path);
            let error = ExtractError::UnsupportedLanguage {
                path: interner.resolve(file_sym).to_string(),
                language: file.language.clone(),
            };
            tracing::debug!(file = %file.path, language = %file.language, "no extractor for language");
            Shard::failed(file_sym, &file.language, file.content_hash, error)
        }
    }
}

fn innermost_enclosing(functions: &[FunctionRecord], line: u32) -> Option<&FunctionRecord> {
    functions
        .iter()
        .filter(|f| f.contains_line(line))
        .min_by_key(|f| (f.span(), std::cmp::Reverse(f.start_line)))
}

fn module_function(
    file_name: &str,
    file: strand_core::types::Symbol,
    language: Language,
    interner: &SymbolInterner,
) -> FunctionRecord {
    let name = interner.intern(MODULE_FUNCTION_NAME);
    FunctionRecord {
        id: FunctionId::derive(file_name, MODULE_FUNCTION_NAME, 0),
        qualified_name: name,
        short_name: name,
        scope: None,
        file,
        language,
        start_line: 0,
        end_line: 0,
        visibility: Visibility::Public,
        is_entry_point: true,
    }
}
