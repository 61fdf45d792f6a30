//! Fatal error kinds surfaced to the caller of an intake run.
//!
//! Anything entry-level or file-level is recoverable and never appears here:
//! it is logged and tallied in the run statistics instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// The top-level input path is missing, of the wrong kind, or out of bounds.
    #[error("invalid input {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    /// The archive could not be opened as a valid container.
    #[error("corrupt archive {}: {source}", path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The requested output directory failed sanitization.
    #[error("invalid output path {path:?}: {reason}")]
    InvalidOutputPath { path: String, reason: String },

    /// The sandbox workspace could not be created.
    #[error("workspace error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    pub(crate) fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IntakeError::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_output(path: impl Into<String>, reason: impl Into<String>) -> Self {
        IntakeError::InvalidOutputPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            IntakeError::InvalidInput { .. } => "invalid_input",
            IntakeError::CorruptArchive { .. } => "corrupt_archive",
            IntakeError::InvalidOutputPath { .. } => "invalid_output_path",
            IntakeError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = IntakeError::invalid_input("/tmp/x.rar", "unsupported archive extension");
        assert_eq!(
            err.to_string(),
            "invalid input /tmp/x.rar: unsupported archive extension"
        );
        assert_eq!(err.kind(), "invalid_input");

        let err = IntakeError::invalid_output("/", "resolves to the filesystem root");
        assert!(err.to_string().contains("filesystem root"));
        assert_eq!(err.kind(), "invalid_output_path");
    }
}
