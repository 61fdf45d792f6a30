//! Outcome accounting for one extraction run.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Why a single archive entry was not written. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySkip {
    /// Name failed the path-escape checks.
    UnsafePath,
    /// Not a source/config file on the whitelist.
    NotWhitelisted,
    /// Declared uncompressed size is above the per-file ceiling.
    DeclaredTooLarge,
    /// Declared sizes imply a compression ratio above the ceiling.
    CompressionRatio,
    /// Actual decompressed bytes ran past the allowance; partial file removed.
    StreamTooLarge,
    /// I/O failure while decompressing the entry or writing the file.
    WriteFailed,
}

impl fmt::Display for EntrySkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EntrySkip::UnsafePath => "unsafe path",
            EntrySkip::NotWhitelisted => "not whitelisted",
            EntrySkip::DeclaredTooLarge => "declared size too large",
            EntrySkip::CompressionRatio => "suspicious compression ratio",
            EntrySkip::StreamTooLarge => "decompressed size too large",
            EntrySkip::WriteFailed => "write failed",
        };
        f.write_str(text)
    }
}

/// Which global ceiling ended the entry stream early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FileCount,
    TotalBytes,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FileCount => write!(f, "file count ceiling reached"),
            StopReason::TotalBytes => write!(f, "total decompressed size ceiling reached"),
        }
    }
}

/// Counters reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeStats {
    /// Entries seen in the archive before the stream ended.
    pub entries_seen: usize,
    /// Files written into the workspace.
    pub files_extracted: usize,
    /// Bytes written into the workspace.
    pub bytes_extracted: u64,
    /// Directory entries materialized.
    pub directories_created: usize,
    /// Skipped entries, by reason.
    pub skipped: BTreeMap<EntrySkip, usize>,
    /// Set when a global ceiling ended extraction early.
    pub stopped: Option<StopReason>,
}

impl IntakeStats {
    pub(crate) fn record_skip(&mut self, reason: EntrySkip) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    /// Number of entries skipped for `reason`.
    pub fn skipped_for(&self, reason: EntrySkip) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Total skipped entries across all reasons.
    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Whether the workspace holds only part of the archive.
    pub fn is_partial(&self) -> bool {
        self.stopped.is_some()
    }
}
