//! Go extractor.

use strand_core::types::Visibility;

use super::CallGraphExtractor;
use crate::language::Language;
use crate::syntax::FunctionDecl;

pub struct GoExtractor;

impl CallGraphExtractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["."]
    }

    /// `main` and `init` run without a caller when they are package-level.
    fn is_conventional_entry_point(&self, short_name: &str, scope: Option<&str>) -> bool {
        let package_level = scope.map_or(true, |s| !s.contains('.') && !starts_uppercase(s));
        package_level && matches!(short_name, "main" | "init")
    }

    /// Exported iff the name starts with an uppercase letter.
    fn effective_visibility(&self, _decl: &FunctionDecl, short_name: &str) -> Visibility {
        if starts_uppercase(short_name) {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
