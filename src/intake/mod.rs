//! Secure ingestion of untrusted input.
//!
//! - `validate`: top-level input and output path gatekeeping
//! - `limits`: resource ceilings and the extraction whitelist
//! - `entry`: per-entry path escape defense
//! - `budget`: the extraction counters and their ceilings
//! - `extract`: streaming archive expansion
//! - `workspace`: the sandbox directory, deleted on drop

pub mod budget;
pub mod entry;
pub mod extract;
pub mod limits;
pub mod outcome;
pub mod validate;
pub mod workspace;

use std::path::{Path, PathBuf};

use crate::error::IntakeError;

pub use budget::{Allowance, ExtractionBudget};
pub use entry::{resolve_entry_path, UnsafePath};
pub use extract::{extract_archive, Extraction, SecureExtractor};
pub use limits::{is_whitelisted, ResourceLimits};
pub use outcome::{EntrySkip, IntakeStats, StopReason};
pub use validate::{validate_input, validate_output_dir, ValidatedInput};
pub use workspace::ExtractedWorkspace;

/// A validated input ready for the orchestrator.
///
/// For archives this owns the workspace, so dropping it deletes the
/// extracted tree.
#[derive(Debug)]
pub struct PreparedInput {
    root: PathBuf,
    workspace: Option<ExtractedWorkspace>,
    stats: Option<IntakeStats>,
}

impl PreparedInput {
    /// Directory the orchestrator should walk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extraction counters, present only for archive input.
    pub fn intake_stats(&self) -> Option<&IntakeStats> {
        self.stats.as_ref()
    }

    pub fn is_extracted(&self) -> bool {
        self.workspace.is_some()
    }
}

/// Validate `input` and, for archives, extract it into a fresh workspace.
pub fn prepare_input(input: &Path, limits: &ResourceLimits) -> Result<PreparedInput, IntakeError> {
    match validate_input(input, limits)? {
        ValidatedInput::Directory(root) => Ok(PreparedInput {
            root,
            workspace: None,
            stats: None,
        }),
        ValidatedInput::Archive(archive) => {
            let Extraction { workspace, stats } = extract_archive(&archive, limits)?;
            Ok(PreparedInput {
                root: workspace.root().to_path_buf(),
                workspace: Some(workspace),
                stats: Some(stats),
            })
        }
    }
}
