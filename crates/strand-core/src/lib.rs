//! Core crate for the Strand call graph engine.
//!
//! Errors, configuration, tracing, interning and identifier types,
//! collections, cancellation, and shared constants.

pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;
pub mod tracing;
pub mod types;
