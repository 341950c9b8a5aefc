//! Python extractor.

use strand_core::types::Visibility;

use super::CallGraphExtractor;
use crate::language::Language;
use crate::syntax::FunctionDecl;

pub struct PythonExtractor;

impl CallGraphExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["."]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["self", "cls", "super()"]
    }

    fn is_conventional_entry_point(&self, short_name: &str, scope: Option<&str>) -> bool {
        scope.is_none() && short_name == "main"
    }

    /// Leading underscores mark private names; dunders stay public.
    fn effective_visibility(&self, decl: &FunctionDecl, short_name: &str) -> Visibility {
        let dunder = short_name.len() > 4 && short_name.starts_with("__") && short_name.ends_with("__");
        if short_name.starts_with('_') && !dunder {
            Visibility::Private
        } else {
            decl.visibility
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_names_are_private() {
        let decl = FunctionDecl::new("Service._load", 1, 2);
        assert_eq!(PythonExtractor.effective_visibility(&decl, "_load"), Visibility::Private);
        assert_eq!(PythonExtractor.effective_visibility(&decl, "__init__"), Visibility::Public);
        assert_eq!(PythonExtractor.effective_visibility(&decl, "load"), Visibility::Public);
    }
}
