//! Content-derived identifiers.
//!
//! Function and call-site ids are xxh3 hashes of the strings that define
//! them, never of interner handles, so a rerun over unchanged input
//! reproduces the same ids even though handles are reassigned.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// The raw 64-bit value.
            pub fn value(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:016x}", self.0)
            }
        }
    };
}

define_id!(
    /// Globally unique function identifier.
    FunctionId
);

define_id!(
    /// Identifier of one call expression inside its caller.
    CallSiteId
);

impl FunctionId {
    /// Derive from (file, qualified name, start line).
    pub fn derive(file: &str, qualified_name: &str, start_line: u32) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(file.as_bytes());
        hasher.update(&[0]);
        hasher.update(qualified_name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&start_line.to_le_bytes());
        Self(hasher.digest())
    }
}

impl CallSiteId {
    /// Derive from the caller and the call's position and target text.
    pub fn derive(caller: FunctionId, target: &str, line: u32, column: u32) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&caller.0.to_le_bytes());
        hasher.update(target.as_bytes());
        hasher.update(&[0]);
        hasher.update(&line.to_le_bytes());
        hasher.update(&column.to_le_bytes());
        Self(hasher.digest())
    }
}
