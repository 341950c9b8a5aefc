//! C# extractor.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct CSharpExtractor;

impl CallGraphExtractor for CSharpExtractor {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["."]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["this", "base"]
    }

    fn is_conventional_entry_point(&self, short_name: &str, _scope: Option<&str>) -> bool {
        short_name == "Main"
    }
}
