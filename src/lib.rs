//! archlens - hardened source-archive intake and structural analysis.
//!
//! archlens accepts an untrusted source archive (or a directory), expands it
//! into a throwaway workspace under strict resource ceilings, and extracts an
//! architectural model: packages, dependency edges, framework usage, design
//! pattern hints, schema and endpoint mentions, and per-language counts.
//!
//! # Architecture
//!
//! - `intake`: input validation, zip-slip and zip-bomb defenses, the
//!   extraction budget, and the self-deleting workspace
//! - `analysis`: language classification, per-language analyzers (with
//!   optional tree-sitter parsing), and the parallel orchestrator
//! - `pipeline`: one end-to-end run tying the two together
//! - `config`: optional YAML config that can only tighten the ceilings
//! - `report`: pretty and JSON output
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/` for examples. Implement `LanguageAnalyzer`
//! and register it in `languages/mod.rs`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use analysis::{
    get_analyzer, AnalysisModel, AnalysisOptions, AnalysisRun, AnalysisStats, DependencyEdge,
    Fidelity, FileSkip, Language, LanguageAnalyzer, ModuleInfo, Orchestrator, SourceUnit,
};
pub use config::Config;
pub use error::IntakeError;
pub use intake::{
    prepare_input, EntrySkip, ExtractedWorkspace, IntakeStats, PreparedInput, ResourceLimits,
    SecureExtractor, StopReason,
};
pub use pipeline::{run, RunReport};
