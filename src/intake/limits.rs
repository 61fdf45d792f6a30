//! Resource ceilings and the extraction whitelist.
//!
//! The defaults are the admission control against hostile archives and are
//! the only backpressure the pipeline has. Configuration may tighten them but
//! never raise them (see `crate::config`).

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Immutable resource ceilings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Largest accepted archive on disk, in bytes.
    pub max_archive_size: u64,
    /// Ceiling on bytes written into the workspace across all entries.
    pub max_total_uncompressed_bytes: u64,
    /// Ceiling on files written into the workspace.
    pub max_file_count: usize,
    /// Largest single source file, both in the archive and on disk.
    pub max_source_file_size: u64,
    /// Largest accepted `uncompressed / compressed` ratio for one entry.
    pub max_compression_ratio: u64,
}

impl ResourceLimits {
    /// Built-in ceilings: 500 MB archive, 2 GB total, 10,000 files,
    /// 10 MB per file, 100:1 compression ratio.
    pub const DEFAULT: ResourceLimits = ResourceLimits {
        max_archive_size: 500 * MIB,
        max_total_uncompressed_bytes: 2 * GIB,
        max_file_count: 10_000,
        max_source_file_size: 10 * MIB,
        max_compression_ratio: 100,
    };
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Container extensions accepted as archive input (lowercase, no dot).
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "jar"];

/// Source and config extensions that may be written into the workspace.
static ALLOWED_SOURCE_EXTENSIONS: phf::Set<&'static str> = phf::phf_set! {
    // Java
    "java",
    // C / C++
    "c", "h", "cpp", "cc", "cxx", "hpp", "c++",
    // C#
    "cs",
    // JavaScript / TypeScript
    "js", "jsx", "ts", "tsx", "mjs", "cjs",
    // Ruby
    "rb", "rake", "gemspec",
    // Rust
    "rs",
    // Kotlin
    "kt", "kts",
    // Python
    "py", "pyw",
    // PHP
    "php", "phtml", "php3", "php4", "php5", "phps",
    // JSP
    "jsp", "jspf", "jspx",
    // Build and config files
    "gradle", "xml", "json", "yaml", "yml", "toml", "properties", "md", "cfg",
};

/// Build and manifest file names accepted regardless of extension (lowercase).
static ALLOWED_FILE_NAMES: phf::Set<&'static str> = phf::phf_set! {
    "gemfile",
    "rakefile",
    "makefile",
    "dockerfile",
    "cmakelists.txt",
    "readme.md",
    "pipfile",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "composer.json",
    "composer.lock",
};

/// Whether a file with this name may be extracted.
///
/// `file_name` is the final path component. Matching is case-insensitive.
/// Names without an extension are only accepted if they are a known build or
/// manifest file.
pub fn is_whitelisted(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    if ALLOWED_FILE_NAMES.contains(lower.as_str()) {
        return true;
    }

    match lower.rfind('.') {
        Some(dot) => ALLOWED_SOURCE_EXTENSIONS.contains(&lower[dot + 1..]),
        None => false,
    }
}

/// Whether `file_name` carries an accepted archive extension.
pub fn has_archive_extension(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}
