//! C and C++.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct NativeExtractor {
    language: Language,
}

pub static CPP: NativeExtractor = NativeExtractor {
    language: Language::Cpp,
};

pub static C: NativeExtractor = NativeExtractor {
    language: Language::C,
};

impl CallGraphExtractor for NativeExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        match self.language {
            Language::Cpp => &["::", "->", "."],
            _ => &["->", "."],
        }
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        match self.language {
            Language::Cpp => &["this"],
            _ => &[],
        }
    }

    fn is_conventional_entry_point(&self, short_name: &str, scope: Option<&str>) -> bool {
        scope.is_none() && matches!(short_name, "main" | "wmain" | "WinMain" | "wWinMain")
    }
}
