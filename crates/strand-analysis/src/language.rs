//! Supported source languages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Java,
    Kotlin,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    Cpp,
    C,
    Swift,
    Scala,
}

/// Languages whose functions can call each other without an FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageFamily {
    EcmaScript,
    Python,
    Jvm,
    DotNet,
    Go,
    Rust,
    Ruby,
    Php,
    Native,
    Swift,
}

impl Language {
    /// Parse a language tag as attached by the parsing collaborator.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lang = match tag.trim().to_ascii_lowercase().as_str() {
            "typescript" | "ts" | "tsx" => Self::TypeScript,
            "javascript" | "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "python" | "py" => Self::Python,
            "java" => Self::Java,
            "kotlin" | "kt" | "kts" => Self::Kotlin,
            "csharp" | "c#" | "cs" => Self::CSharp,
            "go" | "golang" => Self::Go,
            "rust" | "rs" => Self::Rust,
            "ruby" | "rb" => Self::Ruby,
            "php" => Self::Php,
            "cpp" | "c++" | "cxx" | "cc" | "hpp" => Self::Cpp,
            "c" | "h" => Self::C,
            "swift" => Self::Swift,
            "scala" => Self::Scala,
            _ => return None,
        };
        Some(lang)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::CSharp => "csharp",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Swift => "swift",
            Self::Scala => "scala",
        }
    }

    pub fn family(&self) -> LanguageFamily {
        match self {
            Self::TypeScript | Self::JavaScript => LanguageFamily::EcmaScript,
            Self::Python => LanguageFamily::Python,
            Self::Java | Self::Kotlin | Self::Scala => LanguageFamily::Jvm,
            Self::CSharp => LanguageFamily::DotNet,
            Self::Go => LanguageFamily::Go,
            Self::Rust => LanguageFamily::Rust,
            Self::Ruby => LanguageFamily::Ruby,
            Self::Php => LanguageFamily::Php,
            Self::Cpp | Self::C => LanguageFamily::Native,
            Self::Swift => LanguageFamily::Swift,
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Self::TypeScript,
            Self::JavaScript,
            Self::Python,
            Self::Java,
            Self::Kotlin,
            Self::CSharp,
            Self::Go,
            Self::Rust,
            Self::Ruby,
            Self::Php,
            Self::Cpp,
            Self::C,
            Self::Swift,
            Self::Scala,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
