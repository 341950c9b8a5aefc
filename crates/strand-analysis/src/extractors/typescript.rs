//! TypeScript and JavaScript share one extractor.

use strand_core::types::Visibility;

use super::CallGraphExtractor;
use crate::language::Language;
use crate::syntax::FunctionDecl;

pub struct EcmaScriptExtractor {
    language: Language,
}

pub static TYPESCRIPT: EcmaScriptExtractor = EcmaScriptExtractor {
    language: Language::TypeScript,
};

pub static JAVASCRIPT: EcmaScriptExtractor = EcmaScriptExtractor {
    language: Language::JavaScript,
};

impl CallGraphExtractor for EcmaScriptExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["."]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["this", "super"]
    }

    // `#name` is a private class member regardless of what the parser reported.
    fn effective_visibility(&self, decl: &FunctionDecl, short_name: &str) -> Visibility {
        if short_name.starts_with('#') {
            Visibility::Private
        } else {
            decl.visibility
        }
    }
}
