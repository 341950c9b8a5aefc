//! Error handling for Strand.
//! One error enum per subsystem, `thiserror` only.

pub mod call_graph_error;
pub mod config_error;
pub mod error_code;
pub mod extract_error;
pub mod pipeline_error;
pub mod scan_error;
pub mod storage_error;

pub use call_graph_error::CallGraphError;
pub use config_error::ConfigError;
pub use error_code::StrandErrorCode;
pub use extract_error::ExtractError;
pub use pipeline_error::PipelineError;
pub use scan_error::ScanError;
pub use storage_error::StorageError;
