use serde::{Deserialize, Serialize};
use strand_core::types::Visibility;

/// One input file: its path, language tag, and content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: String,
    pub language: String,
    pub content_hash: u64,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, language: impl Into<String>, content_hash: u64) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content_hash,
        }
    }
}

/// A function declaration with its 1-based, inclusive line span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub qualified_name: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_entry_point: bool,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

impl FunctionDecl {
    pub fn new(qualified_name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            start_line,
            end_line,
            visibility: Visibility::Public,
            is_entry_point: false,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn entry_point(mut self) -> Self {
        self.is_entry_point = true;
        self
    }
}

/// A call expression. `target_name` is the textual callee, possibly
/// qualified (`utils.helper`, `Self::new`); `imported_scope` is the module
/// or scope the parser saw the name imported from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExpr {
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_scope: Option<String>,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl CallExpr {
    pub fn new(target_name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            target_name: target_name.into(),
            imported_scope: None,
            line,
            column,
        }
    }

    pub fn imported_from(mut self, scope: impl Into<String>) -> Self {
        self.imported_scope = Some(scope.into());
        self
    }
}

/// Everything the parser reports for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSyntax {
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub calls: Vec<CallExpr>,
}
