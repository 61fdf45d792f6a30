//! Integration tests for archive intake against hostile and benign archives.

mod common;

use std::fs;
use std::path::Path;

use archlens::intake::{extract_archive, validate_input, EntrySkip, ResourceLimits, StopReason};
use archlens::IntakeError;
use tempfile::TempDir;
use walkdir::WalkDir;

use common::{ZipFixture, APP_PY, GEMFILE, MAIN_JAVA, README, SERVICE_JAVA};

fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_benign_archive_extracts_everything() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::deflated()
        .file("app/Main.java", MAIN_JAVA)
        .file("app/Service.java", SERVICE_JAVA)
        .file("README.md", README)
        .write(temp.path(), "shop.zip");

    let extraction = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap();
    let root = extraction.workspace.root();

    assert_eq!(
        files_under(root),
        vec!["README.md", "app/Main.java", "app/Service.java"]
    );
    assert_eq!(extraction.stats.files_extracted, 3);
    assert_eq!(
        extraction.stats.bytes_extracted,
        (MAIN_JAVA.len() + SERVICE_JAVA.len() + README.len()) as u64
    );
    assert_eq!(extraction.stats.total_skipped(), 0);
    assert!(!extraction.stats.is_partial());
    assert_eq!(fs::read_to_string(root.join("app/Main.java")).unwrap(), MAIN_JAVA);
}

#[test]
fn test_zip_slip_entries_are_never_written() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("../../etc/passwd", "root:x:0:0")
        .file("../escape.java", "class Escape {}")
        .file("/abs/Evil.java", "class Evil {}")
        .file("C:/Windows/Evil.java", "class Evil {}")
        .file("..\\..\\Evil.java", "class Evil {}")
        .file("app/ok..java", "class Ok {}")
        .file("app/Good.java", "class Good {}")
        .write(temp.path(), "slip.zip");

    let extraction = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap();
    let root = extraction.workspace.root();

    assert_eq!(files_under(root), vec!["app/Good.java"]);
    assert_eq!(extraction.stats.skipped_for(EntrySkip::UnsafePath), 6);
    assert_eq!(extraction.stats.files_extracted, 1);

    // Nothing landed next to the workspace either.
    let parent = root.parent().unwrap();
    assert!(!parent.join("escape.java").exists());
    assert!(!parent.join("Evil.java").exists());
}

#[test]
fn test_whitelist_enforcement() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("bin/payload.exe", b"MZ\x90\x00")
        .file("scripts/script.sh", "#!/bin/sh\nrm -rf /\n")
        .file("LICENSE", "MIT")
        .file("Gemfile", GEMFILE)
        .file("app/models/order.rb", "class Order; end\n")
        .file("web/app.py", APP_PY)
        .write(temp.path(), "mixed.zip");

    let extraction = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap();
    assert_eq!(
        files_under(extraction.workspace.root()),
        vec!["Gemfile", "app/models/order.rb", "web/app.py"]
    );
    assert_eq!(extraction.stats.skipped_for(EntrySkip::NotWhitelisted), 3);
}

#[test]
fn test_compression_ratio_bomb_is_rejected() {
    let temp = TempDir::new().unwrap();
    // 4 MB of zeros deflates to a few KB: far past 100:1.
    let archive = ZipFixture::deflated()
        .file("bomb.py", vec![0u8; 4 * 1024 * 1024])
        .file("app/ok.py", "print('ok')\n")
        .write(temp.path(), "bomb.zip");
    assert!(fs::metadata(&archive).unwrap().len() < 64 * 1024);

    let extraction = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap();
    assert_eq!(extraction.stats.skipped_for(EntrySkip::CompressionRatio), 1);
    assert!(!extraction.workspace.root().join("bomb.py").exists());
    assert_eq!(files_under(extraction.workspace.root()), vec!["app/ok.py"]);
}

#[test]
fn test_declared_oversize_entry_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("src/Big.java", vec![b'x'; 4096])
        .write(temp.path(), "big.zip");
    let limits = ResourceLimits {
        max_source_file_size: 1024,
        ..ResourceLimits::DEFAULT
    };

    let extraction = extract_archive(&archive, &limits).unwrap();
    assert_eq!(extraction.stats.skipped_for(EntrySkip::DeclaredTooLarge), 1);
    assert!(files_under(extraction.workspace.root()).is_empty());
}

#[test]
fn test_file_count_ceiling_stops_in_archive_order() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("e.py", "e = 5\n")
        .file("d.py", "d = 4\n")
        .file("c.py", "c = 3\n")
        .file("b.py", "b = 2\n")
        .file("a.py", "a = 1\n")
        .write(temp.path(), "many.zip");
    let limits = ResourceLimits {
        max_file_count: 3,
        ..ResourceLimits::DEFAULT
    };

    let extraction = extract_archive(&archive, &limits).unwrap();
    assert_eq!(files_under(extraction.workspace.root()), vec!["c.py", "d.py", "e.py"]);
    assert_eq!(extraction.stats.files_extracted, 3);
    assert_eq!(extraction.stats.stopped, Some(StopReason::FileCount));
    assert!(extraction.stats.is_partial());
}

#[test]
fn test_skipped_entries_do_not_consume_file_count() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("tool.exe", "MZ")
        .file("../x.py", "x = 1\n")
        .file("a.py", "a = 1\n")
        .file("b.py", "b = 2\n")
        .write(temp.path(), "skips.zip");
    let limits = ResourceLimits {
        max_file_count: 2,
        ..ResourceLimits::DEFAULT
    };

    let extraction = extract_archive(&archive, &limits).unwrap();
    assert_eq!(files_under(extraction.workspace.root()), vec!["a.py", "b.py"]);
    assert_eq!(extraction.stats.stopped, None);
}

#[test]
fn test_total_bytes_ceiling_stops_extraction() {
    let temp = TempDir::new().unwrap();
    let body = [b'a'; 100];
    let archive = ZipFixture::stored()
        .file("one.py", body)
        .file("two.py", body)
        .file("three.py", body)
        .file("four.py", body)
        .write(temp.path(), "total.zip");
    let limits = ResourceLimits {
        max_total_uncompressed_bytes: 250,
        max_source_file_size: 200,
        ..ResourceLimits::DEFAULT
    };

    let extraction = extract_archive(&archive, &limits).unwrap();
    let root = extraction.workspace.root();

    assert_eq!(files_under(root), vec!["one.py", "two.py"]);
    assert_eq!(extraction.stats.bytes_extracted, 200);
    assert_eq!(extraction.stats.stopped, Some(StopReason::TotalBytes));
    assert!(!root.join("three.py").exists());
}

#[test]
fn test_oversized_archive_is_rejected_before_extraction() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::stored()
        .file("app/Main.java", MAIN_JAVA)
        .write(temp.path(), "large.zip");
    let size = fs::metadata(&archive).unwrap().len();
    let limits = ResourceLimits {
        max_archive_size: size - 1,
        ..ResourceLimits::DEFAULT
    };

    let err = validate_input(&archive, &limits).unwrap_err();
    assert!(matches!(err, IntakeError::InvalidInput { .. }));
    assert!(err.to_string().contains("too large"));
}

#[test]
fn test_corrupt_archive_is_fatal() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.zip");
    fs::write(&archive, b"PK\x03\x04 this is not really a zip file").unwrap();

    let err = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap_err();
    assert!(matches!(err, IntakeError::CorruptArchive { .. }));
    assert_eq!(err.kind(), "corrupt_archive");
}

#[test]
fn test_workspace_is_removed_when_extraction_is_dropped() {
    let temp = TempDir::new().unwrap();
    let archive = ZipFixture::deflated()
        .file("app/Main.java", MAIN_JAVA)
        .write(temp.path(), "shop.zip");

    let extraction = extract_archive(&archive, &ResourceLimits::DEFAULT).unwrap();
    let root = extraction.workspace.root().to_path_buf();
    assert!(root.join("app/Main.java").exists());

    drop(extraction);
    assert!(!root.exists());
}
