//! String interning for qualified names and file paths.
//!
//! Uses `lasso::ThreadedRodeo` so extraction workers can intern
//! concurrently. Handles are dense `u32`s assigned in insertion order.

use lasso::{Key, Spur, ThreadedRodeo};
use serde::{Deserialize, Serialize};

/// Dense handle for an interned string.
///
/// Stable for the lifetime of the interner that produced it. Handles
/// are not persisted; shards store strings and re-intern on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    /// The raw dense index.
    pub fn index(self) -> u32 {
        self.0
    }

    fn from_spur(spur: Spur) -> Self {
        Self(spur.into_usize() as u32)
    }

    fn to_spur(self) -> Option<Spur> {
        Spur::try_from_usize(self.0 as usize)
    }
}

/// Thread-safe interner shared by every stage of a run.
///
/// Interning the same string twice returns the same handle; memory grows
/// with the number of distinct strings, not with occurrences.
pub struct SymbolInterner {
    inner: ThreadedRodeo,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self {
            inner: ThreadedRodeo::default(),
        }
    }

    /// Intern a name verbatim.
    pub fn intern(&self, value: &str) -> Symbol {
        Symbol::from_spur(self.inner.get_or_intern(value))
    }

    /// Intern a file path after normalizing separators.
    pub fn intern_path(&self, path: &str) -> Symbol {
        self.intern(&normalize_path(path))
    }

    /// Look up a previously interned name without inserting.
    pub fn get(&self, value: &str) -> Option<Symbol> {
        self.inner.get(value).map(Symbol::from_spur)
    }

    /// Look up a previously interned path without inserting.
    pub fn get_path(&self, path: &str) -> Option<Symbol> {
        self.get(&normalize_path(path))
    }

    /// Resolve a handle back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` was not produced by this interner.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        match self.try_resolve(symbol) {
            Some(s) => s,
            None => panic!("symbol {} was not produced by this interner", symbol.0),
        }
    }

    /// Resolve a handle, returning `None` for foreign handles.
    pub fn try_resolve(&self, symbol: Symbol) -> Option<&str> {
        symbol.to_spur().and_then(|k| self.inner.try_resolve(&k))
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for SymbolInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SymbolInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolInterner")
            .field("len", &self.len())
            .finish()
    }
}

/// Normalize a path: backslashes to forward slashes, collapse `//`,
/// strip a leading `./` and any trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut result = path.replace('\\', "/");
    while result.contains("//") {
        result = result.replace("//", "/");
    }
    while let Some(rest) = result.strip_prefix("./") {
        result = rest.to_string();
    }
    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}
