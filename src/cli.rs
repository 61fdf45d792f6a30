//! Command-line interface for archlens.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use crate::config::{self, Config};
use crate::error::IntakeError;
use crate::intake::validate_output_dir;
use crate::logging::{self, Verbosity};
use crate::pipeline;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Hardened source-archive intake and structural analysis.
///
/// Accepts a .zip/.jar archive or a directory, extracts archives into a
/// sandboxed workspace under strict resource ceilings, and reports the
/// packages, dependencies, frameworks, design patterns, schemas and endpoints
/// found across Java, C#, JavaScript/TypeScript, C/C++, Ruby, Rust, Kotlin,
/// Python, PHP and JSP sources.
#[derive(Parser)]
#[command(name = "archlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an archive or directory
    Analyze(AnalyzeArgs),
    /// Print the active resource limits
    Limits(LimitsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Archive (.zip, .jar) or directory to analyze
    pub input: PathBuf,

    /// Directory to write analysis.json into
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format on stdout
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads for analysis
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Log per-file detail and print full error chains
    #[arg(long)]
    pub debug: bool,
}

/// Arguments for the limits command.
#[derive(Parser)]
pub struct LimitsArgs {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let (config, source) = config::load(explicit, &cwd)?;
    match source {
        Some(path) => info!(config = %path.display(), "loaded config"),
        None => debug!("no config file, using built-in limits"),
    }
    Ok(config)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    logging::init(Verbosity::from_flags(args.verbose, args.debug));

    if args.jobs == Some(0) {
        anyhow::bail!("--jobs must be at least 1");
    }
    let config = load_config(args.config.as_deref())?;
    let limits = config.effective_limits();
    let options = config.analysis_options(args.jobs)?;

    // Checked before any work so a bad destination never costs an extraction.
    let output_dir = args
        .output
        .as_deref()
        .map(validate_output_dir)
        .transpose()?;

    let report = pipeline::run(&args.input, &limits, &options)?;

    match args.format {
        OutputFormat::Json => report::write_json(&report)?,
        OutputFormat::Pretty => report::write_pretty(&report),
    }

    if let Some(dir) = output_dir {
        let path = report::write_json_file(&dir, &report)?;
        info!(path = %path.display(), "wrote report");
        if args.format == OutputFormat::Pretty {
            println!("  Report written to {}", path.display());
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Run the limits command.
pub fn run_limits(args: &LimitsArgs) -> anyhow::Result<i32> {
    logging::init(Verbosity::Quiet);
    let limits = load_config(args.config.as_deref())?.effective_limits();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&limits)?),
        OutputFormat::Pretty => report::write_limits(&limits),
    }
    Ok(EXIT_SUCCESS)
}

/// Print a fatal error to stderr.
///
/// Diagnostic mode shows the full cause chain; otherwise only the top-level
/// message and, for intake failures, its kind.
pub fn print_error(err: &anyhow::Error, diagnostic: bool) {
    if diagnostic {
        eprintln!("Error: {:?}", err);
        return;
    }

    eprintln!("Error: {}", err);
    if let Some(intake) = err.downcast_ref::<IntakeError>() {
        eprintln!("  kind: {}", intake.kind());
    }
    if err.chain().nth(1).is_some() {
        eprintln!("  (rerun with --debug for details)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_args() {
        let cli = Cli::try_parse_from([
            "archlens", "analyze", "shop.zip", "--output", "out", "--format", "json", "-j", "4",
            "--verbose",
        ])
        .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.input, PathBuf::from("shop.zip"));
        assert_eq!(args.output.as_deref(), Some("out"));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.jobs, Some(4));
        assert!(args.verbose);
        assert!(!args.debug);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["archlens", "analyze", ".", "--format", "sarif"]).is_err());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let args = AnalyzeArgs {
            input: PathBuf::from("/definitely/not/here.zip"),
            output: None,
            format: OutputFormat::Json,
            config: None,
            jobs: None,
            verbose: false,
            debug: false,
        };
        let err = run_analyze(&args).unwrap_err();
        let intake = err.downcast_ref::<IntakeError>().unwrap();
        assert_eq!(intake.kind(), "invalid_input");
    }
}
