//! Sandbox directory owned by exactly one run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::IntakeError;

const WORKSPACE_PREFIX: &str = "archlens-";

/// A fresh temporary directory that is removed recursively when dropped.
///
/// Every exit path of a run (success, fatal error, panic unwinding) releases
/// it, because ownership is the only handle to the directory.
#[derive(Debug)]
pub struct ExtractedWorkspace {
    dir: TempDir,
    root: PathBuf,
}

impl ExtractedWorkspace {
    /// Create an empty workspace under the system temp directory.
    pub fn create() -> Result<Self, IntakeError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        // Entry paths are checked with `starts_with(root)`, so the root must
        // be canonical (e.g. /tmp may itself be a symlink).
        let root = dir.path().canonicalize()?;
        debug!(root = %root.display(), "created workspace");
        Ok(Self { dir, root })
    }

    /// Canonical absolute root of the workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete the workspace now, reporting any I/O failure.
    pub fn close(self) -> Result<(), IntakeError> {
        self.dir.close()?;
        Ok(())
    }
}
