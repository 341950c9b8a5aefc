//! Inbound model: per-file syntax as delivered by the parsing collaborator.
//!
//! The engine never parses source text itself. A [`SyntaxProvider`] lists
//! the input files and hands over each file's declared functions and call
//! expressions on demand.

pub mod provider;
pub mod types;

pub use provider::{JsonDirProvider, MemoryProvider, SyntaxProvider};
pub use types::{CallExpr, FileDescriptor, FileSyntax, FunctionDecl};
