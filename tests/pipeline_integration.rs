//! End-to-end runs: intake, analysis, and CLI output.

mod common;

use std::fs;
use std::path::PathBuf;

use archlens::analysis::{AnalysisOptions, FileSkip, Language};
use archlens::cli::{run_analyze, AnalyzeArgs, OutputFormat, EXIT_SUCCESS};
use archlens::intake::{EntrySkip, ResourceLimits};
use archlens::{run, IntakeError, RunReport};
use tempfile::TempDir;

use common::{ZipFixture, APP_PY, GEMFILE, MAIN_JAVA, README, SERVICE_JAVA};

fn analyze(path: &std::path::Path) -> RunReport {
    run(path, &ResourceLimits::DEFAULT, &AnalysisOptions::default()).unwrap()
}

#[test]
fn test_benign_three_file_archive() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::deflated()
        .file("app/Main.java", MAIN_JAVA)
        .file("app/Service.java", SERVICE_JAVA)
        .file("README.md", README)
        .write(temp.path(), "shop.zip");

    let report = analyze(&archive);
    let intake = report.intake.as_ref().unwrap();
    assert!(report.archive);
    assert_eq!(intake.files_extracted, 3);

    let model = &report.analysis.model;
    assert_eq!(model.file_count(Language::Java), 2);
    assert_eq!(model.total_file_count(), 2);
    assert!(model.class_count >= 2);
    assert!(model.packages.contains("com.shop.app"));
    assert!(model.packages.contains("com.shop.app.service"));
    assert_eq!(model.framework_count("Spring Service"), 1);
    assert_eq!(report.analysis.stats.files_analyzed, 2);
}

#[test]
fn test_hostile_entries_reduce_the_analyzed_set() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::deflated()
        .file("../../etc/passwd", "root:x:0:0")
        .file("payload.exe", b"MZ\x90\x00")
        .file("bomb.py", vec![0u8; 2 * 1024 * 1024])
        .file("web/app.py", APP_PY)
        .file("Gemfile", GEMFILE)
        .write(temp.path(), "hostile.zip");

    let report = analyze(&archive);
    let intake = report.intake.as_ref().unwrap();
    assert_eq!(intake.skipped_for(EntrySkip::UnsafePath), 1);
    assert_eq!(intake.skipped_for(EntrySkip::NotWhitelisted), 1);
    assert_eq!(intake.skipped_for(EntrySkip::CompressionRatio), 1);

    let model = &report.analysis.model;
    assert_eq!(model.file_count(Language::Python), 1);
    assert_eq!(model.file_count(Language::Ruby), 1);
    assert!(model
        .dependencies
        .iter()
        .any(|d| d.from == "Gemfile" && d.to == "rails" && d.kind == "gem"));
    assert!(model.endpoints.iter().any(|e| e.contains("/health")));
}

#[test]
fn test_aggregation_is_independent_of_archive_order() {
    let temp = TempDir::new().unwrap();
    let files = [
        ("app/Main.java", MAIN_JAVA),
        ("app/Service.java", SERVICE_JAVA),
        ("web/app.py", APP_PY),
        ("Gemfile", GEMFILE),
    ];

    let mut forward = ZipFixture::deflated();
    for (name, body) in files {
        forward = forward.file(name, body);
    }
    let mut backward = ZipFixture::deflated();
    for (name, body) in files.iter().rev() {
        backward = backward.file(name, body);
    }

    let a = analyze(&forward.write(temp.path(), "forward.zip")).analysis;
    let b = analyze(&backward.write(temp.path(), "backward.zip")).analysis;

    assert_eq!(a.model.packages, b.model.packages);
    assert_eq!(a.model.frameworks, b.model.frameworks);
    assert_eq!(a.model.language_files, b.model.language_files);
    assert_eq!(a.model.class_count, b.model.class_count);
    assert_eq!(a.modules, b.modules);

    let mut edges_a = a.model.dependencies.clone();
    let mut edges_b = b.model.dependencies.clone();
    edges_a.sort_by(|x, y| (&x.from, &x.to).cmp(&(&y.from, &y.to)));
    edges_b.sort_by(|x, y| (&x.from, &x.to).cmp(&(&y.from, &y.to)));
    assert_eq!(edges_a, edges_b);
}

#[test]
fn test_directory_input_skips_oversized_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("project");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/Main.java"), MAIN_JAVA).unwrap();
    fs::write(root.join("src/Generated.java"), "// generated\n".repeat(200)).unwrap();

    let limits = ResourceLimits {
        max_source_file_size: 1024,
        ..ResourceLimits::DEFAULT
    };
    let report = run(&root, &limits, &AnalysisOptions::new(&limits)).unwrap();

    assert!(!report.archive);
    assert!(report.intake.is_none());
    assert_eq!(report.analysis.stats.files_analyzed, 1);
    assert_eq!(report.analysis.stats.skipped_for(FileSkip::Oversized), 1);
}

#[test]
fn test_tighter_limits_override_looser_options() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Main.java"), MAIN_JAVA).unwrap();

    let limits = ResourceLimits {
        max_source_file_size: 16,
        ..ResourceLimits::DEFAULT
    };
    let report = run(temp.path(), &limits, &AnalysisOptions::default()).unwrap();
    assert_eq!(report.analysis.stats.skipped_for(FileSkip::Oversized), 1);
}

#[test]
fn test_fatal_errors() {
    let temp = TempDir::new().unwrap();

    let missing = run(
        &temp.path().join("nope.zip"),
        &ResourceLimits::DEFAULT,
        &AnalysisOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(missing, IntakeError::InvalidInput { .. }));

    let corrupt = temp.path().join("corrupt.zip");
    fs::write(&corrupt, "definitely not a zip").unwrap();
    let err = run(&corrupt, &ResourceLimits::DEFAULT, &AnalysisOptions::default()).unwrap_err();
    assert!(matches!(err, IntakeError::CorruptArchive { .. }));

    let rar = temp.path().join("source.rar");
    fs::write(&rar, "Rar!").unwrap();
    let err = run(&rar, &ResourceLimits::DEFAULT, &AnalysisOptions::default()).unwrap_err();
    assert!(matches!(err, IntakeError::InvalidInput { .. }));
}

#[test]
fn test_cli_writes_report_to_output_dir() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("app/Main.java", MAIN_JAVA)
        .file("README.md", README)
        .write(temp.path(), "shop.zip");
    let out = temp.path().join("reports/run1");

    let args = AnalyzeArgs {
        input: archive,
        output: Some(out.to_string_lossy().to_string()),
        format: OutputFormat::Json,
        config: None,
        jobs: Some(2),
        verbose: false,
        debug: false,
    };
    assert_eq!(run_analyze(&args).unwrap(), EXIT_SUCCESS);

    let written = fs::read_to_string(out.join("analysis.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["archive"], true);
    assert_eq!(value["intake"]["files_extracted"], 2);
    assert_eq!(value["analysis"]["model"]["language_files"]["Java"], 1);
}

#[test]
fn test_cli_rejects_bad_output_path_before_running() {
    let temp = TempDir::new().unwrap();
    let args = AnalyzeArgs {
        input: PathBuf::from(temp.path()),
        output: Some("/".to_string()),
        format: OutputFormat::Json,
        config: None,
        jobs: None,
        verbose: false,
        debug: false,
    };
    let err = run_analyze(&args).unwrap_err();
    let intake = err.downcast_ref::<IntakeError>().unwrap();
    assert_eq!(intake.kind(), "invalid_output_path");
}
