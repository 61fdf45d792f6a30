//! Multi-language structural analysis.
//!
//! Every classified file becomes a [`SourceUnit`] handed to the analyzer for
//! its [`Language`]. Analyzers write into a per-unit [`AnalysisModel`], and
//! the orchestrator folds those partial models into one:
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ Workspace walk  │────▶│ Classifier   │────▶│ SourceUnit     │
//! └─────────────────┘     │ (name → lang)│     └────────────────┘
//!                         └──────────────┘             │
//!                                                      ▼
//!                         ┌──────────────┐     ┌────────────────┐
//!                         │AnalysisModel │◀────│ Analyzer pool  │
//!                         │ (merged)     │     │ (rayon, partial│
//!                         └──────────────┘     │  models)       │
//!                                              └────────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Add the variant and its extensions to `language.rs`
//! 2. Create a module in `src/analysis/languages/` implementing
//!    [`LanguageAnalyzer`]
//! 3. If a tree-sitter grammar exists, add it to `syntax.rs` and ask for a
//!    [`SourceView`] before scanning text
//! 4. Register the analyzer in `languages/mod.rs`

pub mod language;
mod languages;
pub mod model;
pub mod orchestrator;
pub mod rules;
pub mod syntax;
mod traits;

pub use language::Language;
pub use languages::{
    get_analyzer, CAnalyzer, CSharpAnalyzer, CppAnalyzer, JavaAnalyzer, JavaScriptAnalyzer,
    JspAnalyzer, KotlinAnalyzer, PhpAnalyzer, PythonAnalyzer, RubyAnalyzer, RustAnalyzer,
};
pub use model::{AnalysisModel, DependencyEdge, ModuleInfo};
pub use orchestrator::{
    default_jobs, AnalysisOptions, AnalysisRun, AnalysisStats, FileSkip, Orchestrator,
};
pub use syntax::{Grammar, SourceView, StructuralFacts};
pub use traits::{Fidelity, LanguageAnalyzer, SourceUnit};
