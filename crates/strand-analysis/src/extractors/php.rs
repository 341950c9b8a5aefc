//! PHP extractor.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct PhpExtractor;

impl CallGraphExtractor for PhpExtractor {
    fn language(&self) -> Language {
        Language::Php
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["::", "->", "\\"]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["$this", "self", "static", "parent"]
    }
}
