//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::BTreeMap;

/// SmallVec for index candidates per name (usually <4).
pub type SmallVec4<T> = SmallVec<[T; 4]>;

/// SmallVec for per-function call lists (usually <8).
pub type SmallVec8<T> = SmallVec<[T; 8]>;
