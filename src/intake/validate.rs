//! Gatekeeping of the top-level input and output paths.
//!
//! Only filesystem stat calls happen here; nothing is read, written, or
//! extracted until a path has been accepted.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::IntakeError;

use super::entry::normalize_lexically;
use super::limits::{has_archive_extension, ResourceLimits, ARCHIVE_EXTENSIONS};

/// An input path that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedInput {
    /// A live directory, analyzed in place.
    Directory(PathBuf),
    /// An archive that still has to go through the extractor.
    Archive(PathBuf),
}

impl ValidatedInput {
    /// The canonical path that was accepted.
    pub fn path(&self) -> &Path {
        match self {
            ValidatedInput::Directory(p) | ValidatedInput::Archive(p) => p,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, ValidatedInput::Archive(_))
    }
}

/// Decide whether `path` is a usable directory or a usable archive.
pub fn validate_input(path: &Path, limits: &ResourceLimits) -> Result<ValidatedInput, IntakeError> {
    let metadata = fs::metadata(path)
        .map_err(|e| IntakeError::invalid_input(path, format!("path does not exist ({})", e)))?;

    if metadata.is_dir() {
        validate_directory(path).map(ValidatedInput::Directory)
    } else {
        validate_archive(path, limits).map(ValidatedInput::Archive)
    }
}

/// Validate a directory input and return its canonical path.
pub fn validate_directory(path: &Path) -> Result<PathBuf, IntakeError> {
    let metadata = fs::metadata(path)
        .map_err(|e| IntakeError::invalid_input(path, format!("directory does not exist ({})", e)))?;
    if !metadata.is_dir() {
        return Err(IntakeError::invalid_input(path, "not a directory"));
    }

    path.canonicalize()
        .map_err(|e| IntakeError::invalid_input(path, format!("cannot resolve directory ({})", e)))
}

/// Validate an archive input and return its canonical path.
///
/// Checks, in order: existence, regular file, extension, non-empty, size
/// ceiling, canonical resolution.
pub fn validate_archive(path: &Path, limits: &ResourceLimits) -> Result<PathBuf, IntakeError> {
    let metadata = fs::metadata(path)
        .map_err(|e| IntakeError::invalid_input(path, format!("file does not exist ({})", e)))?;
    if !metadata.is_file() {
        return Err(IntakeError::invalid_input(path, "not a regular file"));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !has_archive_extension(&name) {
        return Err(IntakeError::invalid_input(
            path,
            format!(
                "unsupported file type {:?}, only .{} archives are accepted",
                name,
                ARCHIVE_EXTENSIONS.join(" or .")
            ),
        ));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(IntakeError::invalid_input(path, "archive is empty"));
    }
    if size > limits.max_archive_size {
        return Err(IntakeError::invalid_input(
            path,
            format!(
                "archive is too large: {:.1} MB (max {} MB)",
                size as f64 / (1024.0 * 1024.0),
                limits.max_archive_size / (1024 * 1024)
            ),
        ));
    }

    path.canonicalize()
        .map_err(|e| IntakeError::invalid_input(path, format!("cannot resolve archive path ({})", e)))
}

/// Sanitize an output directory path.
///
/// Rejects blank paths, NUL bytes, and anything that normalizes to a
/// filesystem root or a Windows system directory. Nested directories that do
/// not exist yet are fine.
pub fn validate_output_dir(raw: &str) -> Result<PathBuf, IntakeError> {
    if raw.trim().is_empty() {
        return Err(IntakeError::invalid_output(raw, "path is empty"));
    }
    if raw.contains('\0') {
        return Err(IntakeError::invalid_output(raw, "path contains a NUL byte"));
    }

    let candidate = Path::new(raw);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| IntakeError::invalid_output(raw, format!("cannot resolve ({})", e)))?
            .join(candidate)
    };
    let normalized = normalize_lexically(&absolute);

    let has_named_component = normalized
        .components()
        .any(|c| matches!(c, Component::Normal(_)));
    if !has_named_component {
        return Err(IntakeError::invalid_output(
            raw,
            "resolves to the filesystem root",
        ));
    }

    let forward = normalized.to_string_lossy().replace('\\', "/").to_ascii_lowercase();
    if forward.ends_with(":/windows") || forward.ends_with(":/windows/") {
        return Err(IntakeError::invalid_output(raw, "refusing to write into a system directory"));
    }

    Ok(normalized)
}
