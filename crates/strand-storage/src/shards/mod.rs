//! Per-file shard persistence.

pub mod lock;
pub mod record;
pub mod store;

pub use lock::StoreLock;
pub use record::{CallRow, FunctionRow, ShardRecord};
pub use store::{ShardKey, ShardStore};
