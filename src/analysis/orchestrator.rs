//! Walks an input root, dispatches each file to its language analyzer, and
//! aggregates the results.
//!
//! Analyzer calls are stateless per unit, so they run on a bounded rayon
//! pool. Each worker returns a partial model; a single aggregator then folds
//! the partials in visitation order, which keeps ordered lists stable no
//! matter how the pool schedules work.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use globset::GlobSet;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::language::Language;
use super::languages::get_analyzer;
use super::model::{AnalysisModel, ModuleInfo};
use super::traits::{Fidelity, SourceUnit};
use crate::intake::ResourceLimits;

/// Why a file found during the walk was not analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSkip {
    /// Larger than the per-file ceiling on disk.
    Oversized,
    /// Could not be listed or read.
    Unreadable,
    /// Matched an `excluded_paths` glob.
    Excluded,
}

impl fmt::Display for FileSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FileSkip::Oversized => "over size limit",
            FileSkip::Unreadable => "unreadable",
            FileSkip::Excluded => "excluded",
        };
        f.write_str(text)
    }
}

/// Counters for one orchestrator walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub files_analyzed: usize,
    pub skipped: BTreeMap<FileSkip, usize>,
    /// Units whose analyzer supports a grammar but had to scan text instead.
    pub heuristic_fallbacks: usize,
}

impl AnalysisStats {
    fn skip(&mut self, reason: FileSkip) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_for(&self, reason: FileSkip) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub model: AnalysisModel,
    pub modules: Vec<ModuleInfo>,
    pub stats: AnalysisStats,
}

/// Knobs for the walk.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Files larger than this on disk are skipped.
    pub max_source_file_size: u64,
    /// Worker threads for analyzer calls.
    pub jobs: usize,
    /// Relative paths matching this set are skipped.
    pub excluded: GlobSet,
}

impl AnalysisOptions {
    pub fn new(limits: &ResourceLimits) -> Self {
        Self {
            max_source_file_size: limits.max_source_file_size,
            jobs: default_jobs(),
            excluded: GlobSet::empty(),
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_excluded(mut self, excluded: GlobSet) -> Self {
        self.excluded = excluded;
        self
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new(&ResourceLimits::DEFAULT)
    }
}

/// Worker count used when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// A classified file awaiting analysis.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    relative: String,
    language: Language,
}

enum FileOutcome {
    Analyzed { partial: AnalysisModel, fallback: bool },
    Skipped(FileSkip),
}

/// Drives one analysis over a directory tree.
pub struct Orchestrator {
    options: AnalysisOptions,
}

impl Orchestrator {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Analyze every classified file under `root`.
    ///
    /// Never fails: unreadable, oversized, and unknown files are skipped and
    /// tallied.
    pub fn analyze(&self, root: &Path) -> AnalysisRun {
        let mut stats = AnalysisStats::default();
        let candidates = self.collect_candidates(root, &mut stats);
        info!(
            root = %root.display(),
            files = candidates.len(),
            jobs = self.options.jobs,
            "analyzing"
        );

        let outcomes = self.run_workers(&candidates);

        let mut model = AnalysisModel::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Analyzed { partial, fallback } => {
                    stats.files_analyzed += 1;
                    if fallback {
                        stats.heuristic_fallbacks += 1;
                    }
                    model.merge(partial);
                }
                FileOutcome::Skipped(reason) => stats.skip(reason),
            }
        }

        let modules = model.modules();
        info!(
            files = stats.files_analyzed,
            packages = model.packages.len(),
            classes = model.class_count,
            fallbacks = stats.heuristic_fallbacks,
            "analysis complete"
        );
        AnalysisRun { model, modules, stats }
    }

    fn collect_candidates(&self, root: &Path, stats: &mut AnalysisStats) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "cannot list path, skipping");
                    stats.skip(FileSkip::Unreadable);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let language = Language::from_path(entry.path());
            if !language.is_known() {
                continue;
            }

            let relative = relative_path(root, entry.path());
            if self.options.excluded.is_match(&relative) {
                debug!(file = %relative, "excluded by configuration");
                stats.skip(FileSkip::Excluded);
                continue;
            }

            candidates.push(Candidate {
                path: entry.into_path(),
                relative,
                language,
            });
        }

        candidates
    }

    fn run_workers(&self, candidates: &[Candidate]) -> Vec<FileOutcome> {
        let max_size = self.options.max_source_file_size;
        let work = || {
            candidates
                .par_iter()
                .map(|c| analyze_candidate(c, max_size))
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.max(1))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, "cannot build worker pool, using the global pool");
                work()
            }
        }
    }
}

fn analyze_candidate(candidate: &Candidate, max_size: u64) -> FileOutcome {
    let content = match read_bounded(&candidate.path, max_size) {
        Ok(Some(content)) => content,
        Ok(None) => {
            warn!(file = %candidate.relative, max = max_size, "file exceeds size limit, skipping");
            return FileOutcome::Skipped(FileSkip::Oversized);
        }
        Err(e) => {
            warn!(file = %candidate.relative, error = %e, "cannot read file, skipping");
            return FileOutcome::Skipped(FileSkip::Unreadable);
        }
    };

    let Some(analyzer) = get_analyzer(candidate.language) else {
        return FileOutcome::Skipped(FileSkip::Unreadable);
    };

    let unit = SourceUnit::new(candidate.relative.clone(), candidate.language, content);
    let mut partial = AnalysisModel::new();
    let fidelity = analyzer.analyze(&unit, &mut partial);
    partial.record_file(candidate.language);
    debug!(file = %candidate.relative, language = %candidate.language, ?fidelity, "analyzed");

    FileOutcome::Analyzed {
        partial,
        fallback: analyzer.supports_structured_parsing() && fidelity == Fidelity::Heuristic,
    }
}

/// Read at most `max_size` bytes; `None` when the file is larger.
///
/// The cap applies to what is actually read, not to metadata, so a file that
/// grows after listing is still bounded.
fn read_bounded(path: &Path, max_size: u64) -> io::Result<Option<String>> {
    let file = File::open(path)?;
    if file.metadata()?.len() > max_size {
        return Ok(None);
    }

    let mut bytes = Vec::new();
    file.take(max_size.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > max_size {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            root,
            "app/src/com/shop/OrderService.java",
            "package com.shop;\n\nimport com.shop.repo.OrderRepository;\n\npublic class OrderService {}\n",
        );
        write(
            root,
            "app/src/com/shop/repo/OrderRepository.java",
            "package com.shop.repo;\n\npublic interface OrderRepository {}\n",
        );
        write(root, "web/app.py", "from flask import Flask\n\nclass Config:\n    pass\n");
        write(root, "Gemfile", "source 'https://rubygems.org'\ngem 'rails'\n");
        write(root, "README.md", "# shop\n");
        write(root, "notes.txt", "not code");
        temp
    }

    #[test]
    fn test_walk_classifies_and_aggregates() {
        let temp = sample_tree();
        let run = Orchestrator::new(AnalysisOptions::default()).analyze(temp.path());

        assert_eq!(run.stats.files_analyzed, 4);
        assert_eq!(run.model.file_count(Language::Java), 2);
        assert_eq!(run.model.file_count(Language::Python), 1);
        assert_eq!(run.model.file_count(Language::Ruby), 1);
        assert!(run.model.packages.contains("com.shop"));
        assert!(run.model.packages.contains("com.shop.repo"));
        assert!(run.model.class_count >= 3);
        assert!(run
            .model
            .dependencies
            .iter()
            .any(|d| d.from == "com.shop" && d.to == "com.shop.repo"));
        assert!(run.modules.iter().any(|m| m.name == "repo"));
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let temp = sample_tree();
        let single = Orchestrator::new(AnalysisOptions::default().with_jobs(1)).analyze(temp.path());
        let pooled = Orchestrator::new(AnalysisOptions::default().with_jobs(4)).analyze(temp.path());
        assert_eq!(single.model, pooled.model);
        assert_eq!(single.stats, pooled.stats);
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let temp = sample_tree();
        write(temp.path(), "big/Huge.java", &"// padding\n".repeat(64));

        let mut options = AnalysisOptions::default();
        options.max_source_file_size = 256;
        let run = Orchestrator::new(options).analyze(temp.path());

        assert_eq!(run.stats.skipped_for(FileSkip::Oversized), 1);
        assert_eq!(run.stats.files_analyzed, 4);
    }

    #[test]
    fn test_excluded_paths_are_skipped() {
        let temp = sample_tree();
        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("web/**").unwrap());
        let options = AnalysisOptions::default().with_excluded(builder.build().unwrap());

        let run = Orchestrator::new(options).analyze(temp.path());
        assert_eq!(run.stats.skipped_for(FileSkip::Excluded), 1);
        assert_eq!(run.model.file_count(Language::Python), 0);
    }

    #[test]
    fn test_parse_failures_are_counted_as_fallbacks() {
        let temp = sample_tree();
        write(
            temp.path(),
            "app/src/com/shop/Legacy.java",
            "package com.shop;\n\npublic class Legacy {\n    <?php echo 1; ?>\n}\n",
        );
        write(temp.path(), "web/broken.py", "class Broken(:\n    pass\n");

        let run = Orchestrator::new(AnalysisOptions::default()).analyze(temp.path());

        let expected = if cfg!(feature = "tree-sitter") { 2 } else { 0 };
        assert_eq!(run.stats.heuristic_fallbacks, expected);
        assert_eq!(run.stats.files_analyzed, 6);
        assert_eq!(run.model.file_count(Language::Java), 3);
    }

    #[test]
    fn test_well_formed_tree_has_no_fallbacks() {
        let temp = sample_tree();
        let run = Orchestrator::new(AnalysisOptions::default()).analyze(temp.path());
        assert_eq!(run.stats.heuristic_fallbacks, 0);
    }

    #[test]
    fn test_invalid_utf8_is_read_lossily() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Legacy.java"), b"public class Legacy { String s = \"\xff\"; }").unwrap();

        let run = Orchestrator::new(AnalysisOptions::default()).analyze(temp.path());
        assert_eq!(run.stats.files_analyzed, 1);
        assert_eq!(run.model.class_count, 1);
    }

    #[test]
    fn test_read_bounded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.rb");
        fs::write(&path, "puts 1\n").unwrap();
        assert_eq!(read_bounded(&path, 7).unwrap(), Some("puts 1\n".to_string()));
        assert_eq!(read_bounded(&path, 6).unwrap(), None);
        assert!(read_bounded(&temp.path().join("missing.rb"), 10).is_err());
    }
}
