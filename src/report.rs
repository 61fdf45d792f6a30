//! Output formatting for run reports.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary for human readability
//! - JSON: the full report for programmatic consumption

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::*;

use crate::analysis::{AnalysisModel, Language};
use crate::intake::{IntakeStats, ResourceLimits};
use crate::pipeline::RunReport;

/// File written under `--output`.
pub const REPORT_FILE_NAME: &str = "analysis.json";

/// How many entries each pretty-printed ranking shows.
const TOP_N: usize = 8;

// =============================================================================
// JSON Format
// =============================================================================

pub fn to_json(report: &RunReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report as JSON to stdout.
pub fn write_json(report: &RunReport) -> anyhow::Result<()> {
    println!("{}", to_json(report)?);
    Ok(())
}

/// Persist the report as `<dir>/analysis.json`, creating `dir` if needed.
pub fn write_json_file(dir: &Path, report: &RunReport) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    let path = dir.join(REPORT_FILE_NAME);
    fs::write(&path, to_json(report)?)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

// =============================================================================
// Pretty Format
// =============================================================================

pub fn write_pretty(report: &RunReport) {
    println!();
    print!("  ");
    print!("{}", "archlens".cyan().bold());
    println!(" v{}", report.version);
    println!();

    print!("  {}", "Input:    ".dimmed());
    println!("{}", report.input.display());
    if let Some(intake) = &report.intake {
        write_intake_summary(intake);
    }
    println!();

    let run = &report.analysis;
    let model = &run.model;
    write_language_table(model);
    println!();

    print!("  {}", "Types:        ".dimmed());
    println!("{}", model.class_count.to_string().bold());
    print!("  {}", "Packages:     ".dimmed());
    println!("{} in {} modules", model.packages.len(), run.modules.len());
    print!("  {}", "Dependencies: ".dimmed());
    println!("{}", model.dependencies.len());
    print!("  {}", "Endpoints:    ".dimmed());
    println!("{}", model.endpoints.len());
    print!("  {}", "Schemas:      ".dimmed());
    println!("{}", model.schemas.len());
    println!();

    let frameworks = top_counts(model.frameworks.iter().map(|(k, v)| (k.as_str(), *v)));
    write_ranking("Frameworks", &frameworks);

    let patterns = top_counts(model.patterns.iter().map(|(k, v)| (k.as_str(), v.len())));
    write_ranking("Design patterns", &patterns);

    let modules = top_counts(
        run.modules
            .iter()
            .map(|m| (m.name.as_str(), m.package_count)),
    );
    write_ranking("Modules", &modules);

    let skipped: usize = run.stats.skipped.values().sum();
    if skipped > 0 || run.stats.heuristic_fallbacks > 0 {
        print!("  {}", "Skipped files: ".dimmed());
        let reasons: Vec<String> = run
            .stats
            .skipped
            .iter()
            .map(|(reason, n)| format!("{} {}", n, reason))
            .collect();
        println!("{}", if reasons.is_empty() { "none".to_string() } else { reasons.join(", ") });
        if run.stats.heuristic_fallbacks > 0 {
            println!(
                "  {}",
                format!("{} units analyzed heuristically after a parse failure", run.stats.heuristic_fallbacks)
                    .yellow()
            );
        }
        println!();
    }

    write_final_status(report);
    println!();
}

fn write_intake_summary(intake: &IntakeStats) {
    print!("  {}", "Extracted:".dimmed());
    println!(
        "{} files, {} ({} entries seen)",
        intake.files_extracted,
        human_bytes(intake.bytes_extracted),
        intake.entries_seen
    );

    if intake.total_skipped() > 0 {
        let reasons: Vec<String> = intake
            .skipped
            .iter()
            .map(|(reason, n)| format!("{} {}", n, reason))
            .collect();
        print!("  {}", "Rejected: ".dimmed());
        println!("{}", reasons.join(", ").yellow());
    }
    if let Some(stop) = intake.stopped {
        print!("  {}", "Stopped:  ".dimmed());
        println!("{}", stop.to_string().yellow().bold());
    }
}

fn write_language_table(model: &AnalysisModel) {
    println!("  {} ({} files):", "Languages".bold(), model.total_file_count());
    if model.language_files.is_empty() {
        println!("    {}", "no recognized source files".dimmed());
        return;
    }

    let mut rows: Vec<(Language, usize)> =
        model.language_files.iter().map(|(l, n)| (*l, *n)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (language, count) in rows {
        println!("    {:<12} {}", language.display_name().blue(), count);
    }
}

fn write_ranking(title: &str, rows: &[(&str, usize)]) {
    if rows.is_empty() {
        return;
    }
    println!("  {}:", title.bold());
    for (name, count) in rows {
        println!("    {:<32} {}", name, count.to_string().dimmed());
    }
    println!();
}

fn write_final_status(report: &RunReport) {
    let partial = report
        .intake
        .as_ref()
        .map(IntakeStats::is_partial)
        .unwrap_or(false);
    if partial {
        println!("  {}", "⚠ Analyzed a partial workspace".yellow());
    } else if report.analysis.stats.files_analyzed == 0 {
        println!("  {}", "⚠ No source files analyzed".yellow());
    } else {
        println!("  {}", "✓ Analysis complete".green());
    }
}

/// Print the active ceilings.
pub fn write_limits(limits: &ResourceLimits) {
    println!();
    println!("  {}", "Resource limits".bold());
    println!();
    println!("    {:<32} {}", "max_archive_size", human_bytes(limits.max_archive_size));
    println!(
        "    {:<32} {}",
        "max_total_uncompressed_bytes",
        human_bytes(limits.max_total_uncompressed_bytes)
    );
    println!("    {:<32} {}", "max_file_count", limits.max_file_count);
    println!("    {:<32} {}", "max_source_file_size", human_bytes(limits.max_source_file_size));
    println!("    {:<32} {}:1", "max_compression_ratio", limits.max_compression_ratio);
    println!();
}

// =============================================================================
// Helpers
// =============================================================================

/// Largest counts first, ties by name, at most `TOP_N`.
fn top_counts<'a>(items: impl Iterator<Item = (&'a str, usize)>) -> Vec<(&'a str, usize)> {
    let mut rows: Vec<(&str, usize)> = items.collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    rows.truncate(TOP_N);
    rows
}

/// Binary-unit size, e.g. `10.0 MB`.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
