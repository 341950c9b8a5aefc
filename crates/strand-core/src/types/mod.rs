//! Data structures and string interning for Strand.

pub mod collections;
pub mod identifiers;
pub mod interning;
pub mod visibility;

pub use collections::{FxHashMap, FxHashSet};
pub use identifiers::{CallSiteId, FunctionId};
pub use interning::{Symbol, SymbolInterner};
pub use visibility::Visibility;
