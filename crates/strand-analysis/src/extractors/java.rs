//! Java and Kotlin.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct JvmExtractor {
    language: Language,
}

pub static JAVA: JvmExtractor = JvmExtractor {
    language: Language::Java,
};

pub static KOTLIN: JvmExtractor = JvmExtractor {
    language: Language::Kotlin,
};

impl CallGraphExtractor for JvmExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        match self.language {
            Language::Kotlin => &[".", "::"],
            _ => &["."],
        }
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["this", "super"]
    }

    fn is_conventional_entry_point(&self, short_name: &str, scope: Option<&str>) -> bool {
        match self.language {
            // Kotlin allows a top-level `main`.
            Language::Kotlin => short_name == "main",
            _ => short_name == "main" && scope.is_some(),
        }
    }
}
