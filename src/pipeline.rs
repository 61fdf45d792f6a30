//! One end-to-end run: validate, extract if needed, analyze, release.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::analysis::{AnalysisOptions, AnalysisRun, Orchestrator};
use crate::error::IntakeError;
use crate::intake::{prepare_input, IntakeStats, ResourceLimits};

/// Result of [`run`], handed to whatever renders or scores it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub version: String,
    pub input: PathBuf,
    /// Whether the input was an archive expanded into a workspace.
    pub archive: bool,
    pub limits: ResourceLimits,
    /// Extraction counters, archive input only.
    pub intake: Option<IntakeStats>,
    pub analysis: AnalysisRun,
}

/// Validate `input`, extract it when it is an archive, and analyze it.
///
/// The workspace is owned by this call and removed before it returns, on the
/// error path as well. Only fatal conditions are returned as `Err`; anything
/// entry- or file-level is tallied in the report.
pub fn run(
    input: &Path,
    limits: &ResourceLimits,
    options: &AnalysisOptions,
) -> Result<RunReport, IntakeError> {
    let prepared = prepare_input(input, limits)?;

    let mut options = options.clone();
    options.max_source_file_size = options.max_source_file_size.min(limits.max_source_file_size);
    let analysis = Orchestrator::new(options).analyze(prepared.root());

    let report = RunReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        input: input.to_path_buf(),
        archive: prepared.is_extracted(),
        limits: *limits,
        intake: prepared.intake_stats().cloned(),
        analysis,
    };

    if prepared.is_extracted() {
        info!(workspace = %prepared.root().display(), "releasing workspace");
    }
    drop(prepared);
    Ok(report)
}
