//! Streaming archive expansion into a sandbox workspace.
//!
//! Every entry is treated as hostile. Entries are processed strictly in
//! archive order on the calling thread, so the budget counters have a single
//! owner and the global ceilings cannot be raced.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::IntakeError;

use super::budget::ExtractionBudget;
use super::entry::resolve_entry_path;
use super::limits::{is_whitelisted, ResourceLimits};
use super::outcome::{EntrySkip, IntakeStats, StopReason};
use super::workspace::ExtractedWorkspace;

const CHUNK_SIZE: usize = 8 * 1024;

/// A populated workspace plus the counters describing how it was filled.
#[derive(Debug)]
pub struct Extraction {
    pub workspace: ExtractedWorkspace,
    pub stats: IntakeStats,
}

/// Result of a size-capped copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundedWrite {
    /// All bytes were written.
    Complete(u64),
    /// The source produced more than the cap. Nothing past the cap was written.
    Exceeded,
}

enum EntryOutcome {
    Directory,
    Written(u64),
    Skipped(EntrySkip),
    Stopped(StopReason),
}

/// Expands archives under a fixed set of resource limits.
#[derive(Debug, Clone)]
pub struct SecureExtractor {
    limits: ResourceLimits,
}

impl SecureExtractor {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Expand `archive_path` into a fresh workspace.
    ///
    /// Only an archive that cannot be opened as a container is fatal. Entry
    /// problems are skipped and tallied, and a reached ceiling ends the stream
    /// early with a partial workspace.
    pub fn extract(&self, archive_path: &Path) -> Result<Extraction, IntakeError> {
        let file = File::open(archive_path).map_err(|e| {
            IntakeError::invalid_input(archive_path, format!("cannot open archive ({})", e))
        })?;
        let mut archive = ZipArchive::new(file).map_err(|source| IntakeError::CorruptArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;

        let workspace = ExtractedWorkspace::create()?;
        let mut budget = ExtractionBudget::new(self.limits);
        let mut stats = IntakeStats::default();

        info!(
            archive = %archive_path.display(),
            entries = archive.len(),
            "extracting archive"
        );

        for index in 0..archive.len() {
            if let Err(reason) = budget.begin_entry() {
                warn!(%reason, remaining = archive.len() - index, "stopping extraction early");
                break;
            }
            stats.entries_seen += 1;

            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable archive entry");
                    stats.record_skip(EntrySkip::WriteFailed);
                    continue;
                }
            };
            let name = entry.name().to_owned();

            match self.extract_entry(&mut entry, &name, workspace.root(), &mut budget) {
                EntryOutcome::Directory => stats.directories_created += 1,
                EntryOutcome::Written(bytes) => {
                    debug!(entry = %name, bytes, "extracted");
                }
                EntryOutcome::Skipped(reason) => {
                    warn!(entry = %name, %reason, "skipping archive entry");
                    stats.record_skip(reason);
                }
                EntryOutcome::Stopped(reason) => {
                    warn!(entry = %name, %reason, "stopping extraction early");
                    break;
                }
            }
        }

        stats.files_extracted = budget.file_count();
        stats.bytes_extracted = budget.total_bytes();
        stats.stopped = budget.stopped();

        info!(
            files = stats.files_extracted,
            bytes = stats.bytes_extracted,
            skipped = stats.total_skipped(),
            partial = stats.is_partial(),
            "extraction finished"
        );

        Ok(Extraction { workspace, stats })
    }

    fn extract_entry(
        &self,
        entry: &mut zip::read::ZipFile<'_>,
        name: &str,
        root: &Path,
        budget: &mut ExtractionBudget,
    ) -> EntryOutcome {
        let is_dir = entry.is_dir();
        let declared = entry.size();
        let compressed = entry.compressed_size();
        self.place_entry(entry, name, is_dir, declared, compressed, root, budget)
    }

    #[allow(clippy::too_many_arguments)]
    fn place_entry<R: Read>(
        &self,
        reader: &mut R,
        name: &str,
        is_dir: bool,
        declared: u64,
        compressed: u64,
        root: &Path,
        budget: &mut ExtractionBudget,
    ) -> EntryOutcome {
        let dest = match resolve_entry_path(root, name) {
            Ok(dest) => dest,
            Err(why) => {
                debug!(entry = %name, %why, "rejected entry path");
                return EntryOutcome::Skipped(EntrySkip::UnsafePath);
            }
        };

        if is_dir {
            return match fs::create_dir_all(&dest) {
                Ok(()) => EntryOutcome::Directory,
                Err(e) => {
                    debug!(entry = %name, error = %e, "cannot create directory");
                    EntryOutcome::Skipped(EntrySkip::WriteFailed)
                }
            };
        }

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !is_whitelisted(&file_name) {
            return EntryOutcome::Skipped(EntrySkip::NotWhitelisted);
        }

        if let Err(reason) = budget.screen_declared(Some(declared), Some(compressed)) {
            return EntryOutcome::Skipped(reason);
        }

        let allowance = budget.allowance();
        match write_entry(reader, &dest, allowance.bytes) {
            Ok(BoundedWrite::Complete(written)) => {
                budget.commit(written);
                EntryOutcome::Written(written)
            }
            Ok(BoundedWrite::Exceeded) => {
                remove_partial(&dest);
                if allowance.bounded_by_total {
                    EntryOutcome::Stopped(budget.stop(StopReason::TotalBytes))
                } else {
                    EntryOutcome::Skipped(EntrySkip::StreamTooLarge)
                }
            }
            Err(e) => {
                debug!(entry = %name, error = %e, "write failed");
                remove_partial(&dest);
                EntryOutcome::Skipped(EntrySkip::WriteFailed)
            }
        }
    }
}

/// Expand an archive with the given limits.
pub fn extract_archive(
    archive_path: &Path,
    limits: &ResourceLimits,
) -> Result<Extraction, IntakeError> {
    SecureExtractor::new(*limits).extract(archive_path)
}

fn write_entry<R: Read>(reader: &mut R, dest: &Path, cap: u64) -> io::Result<BoundedWrite> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(dest)?;
    let outcome = copy_bounded(reader, &mut file, cap)?;
    file.flush()?;
    Ok(outcome)
}

/// Copy `reader` into `writer` in fixed-size chunks, refusing to write past `cap`.
///
/// The declared size of an entry is never trusted; this is the runtime
/// re-check against what the decompressor actually produces.
pub fn copy_bounded<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cap: u64,
) -> io::Result<BoundedWrite> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut written: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if written + n as u64 > cap {
            return Ok(BoundedWrite::Exceeded);
        }
        writer.write_all(&buf[..n])?;
        written += n as u64;
    }

    Ok(BoundedWrite::Complete(written))
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "cannot remove partial file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_copy_bounded_accepts_exact_cap() {
        let data = vec![b'a'; CHUNK_SIZE * 2 + 17];
        let mut out = Vec::new();
        let outcome = copy_bounded(&mut Cursor::new(&data), &mut out, data.len() as u64).unwrap();
        assert_eq!(outcome, BoundedWrite::Complete(data.len() as u64));
        assert_eq!(out, data);
    }

    #[test]
    fn test_copy_bounded_never_writes_past_cap() {
        let data = vec![0u8; CHUNK_SIZE * 4];
        let mut out = Vec::new();
        let cap = (CHUNK_SIZE * 2 + 1) as u64;
        let outcome = copy_bounded(&mut Cursor::new(&data), &mut out, cap).unwrap();
        assert_eq!(outcome, BoundedWrite::Exceeded);
        assert!(out.len() as u64 <= cap);
    }

    fn place(
        extractor: &SecureExtractor,
        budget: &mut ExtractionBudget,
        root: &Path,
        name: &str,
        body: &[u8],
        declared: u64,
    ) -> EntryOutcome {
        extractor.place_entry(
            &mut Cursor::new(body.to_vec()),
            name,
            false,
            declared,
            declared,
            root,
            budget,
        )
    }

    #[test]
    fn test_understated_size_is_caught_while_streaming() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let limits = ResourceLimits {
            max_source_file_size: 64,
            ..ResourceLimits::DEFAULT
        };
        let extractor = SecureExtractor::new(limits);
        let mut budget = ExtractionBudget::new(limits);

        // Header claims 10 bytes, stream delivers 200.
        let outcome = place(&extractor, &mut budget, &root, "src/Big.java", &[b'x'; 200], 10);
        assert!(matches!(
            outcome,
            EntryOutcome::Skipped(EntrySkip::StreamTooLarge)
        ));
        assert!(!root.join("src/Big.java").exists());
        assert_eq!(budget.file_count(), 0);
        assert_eq!(budget.total_bytes(), 0);
    }

    #[test]
    fn test_total_ceiling_stops_and_removes_partial() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let limits = ResourceLimits {
            max_source_file_size: 100,
            max_total_uncompressed_bytes: 150,
            ..ResourceLimits::DEFAULT
        };
        let extractor = SecureExtractor::new(limits);
        let mut budget = ExtractionBudget::new(limits);

        let first = place(&extractor, &mut budget, &root, "a.py", &[b'a'; 100], 100);
        assert!(matches!(first, EntryOutcome::Written(100)));

        let second = place(&extractor, &mut budget, &root, "b.py", &[b'b'; 80], 80);
        assert!(matches!(
            second,
            EntryOutcome::Stopped(StopReason::TotalBytes)
        ));
        assert!(root.join("a.py").exists());
        assert!(!root.join("b.py").exists());
        assert_eq!(budget.total_bytes(), 100);
        assert_eq!(budget.begin_entry(), Err(StopReason::TotalBytes));
    }

    #[test]
    fn test_skips_before_writing_any_bytes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let extractor = SecureExtractor::new(ResourceLimits::DEFAULT);
        let mut budget = ExtractionBudget::new(ResourceLimits::DEFAULT);

        let outcome = place(&extractor, &mut budget, &root, "../../etc/passwd", b"root", 4);
        assert!(matches!(outcome, EntryOutcome::Skipped(EntrySkip::UnsafePath)));

        let outcome = place(&extractor, &mut budget, &root, "bin/payload.exe", b"MZ", 2);
        assert!(matches!(
            outcome,
            EntryOutcome::Skipped(EntrySkip::NotWhitelisted)
        ));
        assert!(!root.join("bin").exists());
    }
}
