//! Reachability over the call graph.

pub mod bfs;
pub mod sensitivity;
pub mod types;

pub use bfs::{forward_reachable, inverse_reachable, reachable_from};
pub use sensitivity::{unauthenticated_exposures, Exposure, SecurityAnnotations};
pub use types::{ReachabilityResult, TraversalDirection};
