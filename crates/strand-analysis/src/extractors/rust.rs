//! Rust extractor.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct RustExtractor;

impl CallGraphExtractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["::", "."]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["self", "Self", "super", "crate"]
    }

    fn is_conventional_entry_point(&self, short_name: &str, scope: Option<&str>) -> bool {
        short_name == "main" && matches!(scope, None | Some("crate"))
    }
}
