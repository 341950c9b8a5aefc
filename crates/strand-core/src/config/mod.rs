//! Configuration system for Strand.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod build_config;
pub mod dead_code_config;
pub mod index_config;
pub mod resolution_config;
pub mod strand_config;

pub use build_config::BuildConfig;
pub use dead_code_config::DeadCodeConfig;
pub use index_config::IndexConfig;
pub use resolution_config::ResolutionConfig;
pub use strand_config::{CliOverrides, StrandConfig};
