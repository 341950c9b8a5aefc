//! Ruby extractor. `Mod::Klass#method` names instance methods and
//! `Klass.method` class methods.

use super::CallGraphExtractor;
use crate::language::Language;

pub struct RubyExtractor;

impl CallGraphExtractor for RubyExtractor {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn scope_separators(&self) -> &'static [&'static str] {
        &["::", "#", "."]
    }

    fn receiver_keywords(&self) -> &'static [&'static str] {
        &["self"]
    }
}
