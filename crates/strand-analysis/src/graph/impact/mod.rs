//! Impact analysis: dead code and change impact.

pub mod blast_radius;
pub mod dead_code;
pub mod types;

pub use blast_radius::impact;
pub use dead_code::{detect_dead_code, DeadCodeAllowlist};
pub use types::{DeadCodeReason, DeadCodeResult, ImpactReport};
