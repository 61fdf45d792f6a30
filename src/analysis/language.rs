//! Language classification from file names.
//!
//! Pure lookup: the same name always yields the same language, and content
//! is never inspected.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Languages the analyzers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Language {
    Java,
    #[serde(rename = "C#")]
    CSharp,
    JavaScript,
    TypeScript,
    C,
    #[serde(rename = "C++")]
    Cpp,
    Ruby,
    Rust,
    Kotlin,
    Python,
    #[serde(rename = "PHP")]
    Php,
    #[serde(rename = "JSP")]
    Jsp,
    Unknown,
}

/// Extension-less (or extension-misleading) build and manifest files.
///
/// Checked before the extension table so that e.g. `requirements.txt` or
/// `composer.json` reach the language that owns them.
static SPECIAL_FILE_NAMES: phf::Map<&'static str, Language> = phf::phf_map! {
    "gemfile" => Language::Ruby,
    "rakefile" => Language::Ruby,
    "cargo.toml" => Language::Rust,
    "build.rs" => Language::Rust,
    "requirements.txt" => Language::Python,
    "pipfile" => Language::Python,
    "pyproject.toml" => Language::Python,
    "setup.py" => Language::Python,
    "setup.cfg" => Language::Python,
    "composer.json" => Language::Php,
    "composer.lock" => Language::Php,
};

static EXTENSIONS: phf::Map<&'static str, Language> = phf::phf_map! {
    "java" => Language::Java,
    "cs" => Language::CSharp,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
    "c" => Language::C,
    "h" => Language::C,
    "cpp" => Language::Cpp,
    "cc" => Language::Cpp,
    "cxx" => Language::Cpp,
    "c++" => Language::Cpp,
    "hpp" => Language::Cpp,
    "rb" => Language::Ruby,
    "rake" => Language::Ruby,
    "gemspec" => Language::Ruby,
    "rs" => Language::Rust,
    "kt" => Language::Kotlin,
    "kts" => Language::Kotlin,
    "py" => Language::Python,
    "pyw" => Language::Python,
    "php" => Language::Php,
    "phtml" => Language::Php,
    "php3" => Language::Php,
    "php4" => Language::Php,
    "php5" => Language::Php,
    "phps" => Language::Php,
    "jsp" => Language::Jsp,
    "jspf" => Language::Jsp,
    "jspx" => Language::Jsp,
};

impl Language {
    /// Every analyzable language, in declaration order.
    pub const ALL: [Language; 12] = [
        Language::Java,
        Language::CSharp,
        Language::JavaScript,
        Language::TypeScript,
        Language::C,
        Language::Cpp,
        Language::Ruby,
        Language::Rust,
        Language::Kotlin,
        Language::Python,
        Language::Php,
        Language::Jsp,
    ];

    /// Classify a file by its final path component.
    pub fn from_file_name(file_name: &str) -> Language {
        let lower = file_name.to_ascii_lowercase();
        if let Some(lang) = SPECIAL_FILE_NAMES.get(lower.as_str()) {
            return *lang;
        }

        match lower.rfind('.') {
            // A leading dot is a hidden file, not an extension.
            Some(dot) if dot > 0 => EXTENSIONS
                .get(&lower[dot + 1..])
                .copied()
                .unwrap_or(Language::Unknown),
            _ => Language::Unknown,
        }
    }

    /// Classify a path by its file name.
    pub fn from_path(path: &Path) -> Language {
        path.file_name()
            .map(|n| Language::from_file_name(&n.to_string_lossy()))
            .unwrap_or(Language::Unknown)
    }

    /// Human-readable name, as used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Ruby => "Ruby",
            Language::Rust => "Rust",
            Language::Kotlin => "Kotlin",
            Language::Python => "Python",
            Language::Php => "PHP",
            Language::Jsp => "JSP",
            Language::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Language::Unknown
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whether `file_name` is one of the special manifest names.
pub fn is_manifest_name(file_name: &str) -> bool {
    SPECIAL_FILE_NAMES.contains_key(file_name.to_ascii_lowercase().as_str())
}
