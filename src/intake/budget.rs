//! Deterministic budget tracking for one archive expansion.
//!
//! # Invariants
//! - Exactly one `ExtractionBudget` exists per run and it is owned by the
//!   thread walking the entry stream; the check-then-act sequences below are
//!   never interleaved.
//! - Both counters only grow. Once a stop reason is latched it never clears.
//! - Committed totals never exceed `max_file_count` files or
//!   `max_total_uncompressed_bytes` bytes.
//!
//! # Algorithm
//! - `begin_entry` enforces the file-count ceiling before an entry is touched.
//! - `screen_declared` applies the header-based size and ratio pre-checks.
//! - `allowance` hands the writer a hard byte cap: the per-file ceiling, or
//!   whatever is left of the total budget if that is smaller.
//! - `commit` charges a completed file.

use super::limits::ResourceLimits;
use super::outcome::{EntrySkip, StopReason};

/// Byte cap for the next entry and which ceiling produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    pub bytes: u64,
    /// True when the remaining total budget, not the per-file ceiling, is the cap.
    pub bounded_by_total: bool,
}

/// Two monotonically increasing counters with two early-exit conditions.
#[derive(Debug, Clone)]
pub struct ExtractionBudget {
    limits: ResourceLimits,
    file_count: usize,
    total_bytes: u64,
    stopped: Option<StopReason>,
}

impl ExtractionBudget {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            file_count: 0,
            total_bytes: 0,
            stopped: None,
        }
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn stopped(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Admit the next entry, or latch a stop if a global ceiling is reached.
    pub fn begin_entry(&mut self) -> Result<(), StopReason> {
        if let Some(reason) = self.stopped {
            return Err(reason);
        }
        if self.file_count >= self.limits.max_file_count {
            return Err(self.stop(StopReason::FileCount));
        }
        Ok(())
    }

    /// Header-based pre-checks. `None` means the size is not recorded.
    pub fn screen_declared(
        &self,
        uncompressed: Option<u64>,
        compressed: Option<u64>,
    ) -> Result<(), EntrySkip> {
        if let Some(size) = uncompressed {
            if size > self.limits.max_source_file_size {
                return Err(EntrySkip::DeclaredTooLarge);
            }
        }

        if let (Some(u), Some(c)) = (uncompressed, compressed) {
            if u > 0 && c > 0 && u / c > self.limits.max_compression_ratio {
                return Err(EntrySkip::CompressionRatio);
            }
        }

        Ok(())
    }

    /// Hard byte cap for the next file write.
    pub fn allowance(&self) -> Allowance {
        let remaining = self
            .limits
            .max_total_uncompressed_bytes
            .saturating_sub(self.total_bytes);
        if remaining < self.limits.max_source_file_size {
            Allowance {
                bytes: remaining,
                bounded_by_total: true,
            }
        } else {
            Allowance {
                bytes: self.limits.max_source_file_size,
                bounded_by_total: false,
            }
        }
    }

    /// Charge a fully written file.
    pub fn commit(&mut self, written: u64) {
        self.file_count += 1;
        self.total_bytes = self.total_bytes.saturating_add(written);
    }

    /// Latch a stop reason and return it.
    pub fn stop(&mut self, reason: StopReason) -> StopReason {
        *self.stopped.get_or_insert(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight(files: usize, total: u64, per_file: u64) -> ExtractionBudget {
        ExtractionBudget::new(ResourceLimits {
            max_file_count: files,
            max_total_uncompressed_bytes: total,
            max_source_file_size: per_file,
            ..ResourceLimits::DEFAULT
        })
    }

    #[test]
    fn test_file_count_ceiling_latches() {
        let mut budget = tight(2, 1_000, 100);
        for _ in 0..2 {
            assert!(budget.begin_entry().is_ok());
            budget.commit(10);
        }
        assert_eq!(budget.begin_entry(), Err(StopReason::FileCount));
        assert_eq!(budget.stopped(), Some(StopReason::FileCount));
        assert_eq!(budget.file_count(), 2);
        assert_eq!(budget.total_bytes(), 20);
    }

    #[test]
    fn test_allowance_shrinks_to_remaining_total() {
        let mut budget = tight(100, 250, 100);
        assert_eq!(
            budget.allowance(),
            Allowance {
                bytes: 100,
                bounded_by_total: false
            }
        );

        budget.commit(100);
        budget.commit(100);
        assert_eq!(
            budget.allowance(),
            Allowance {
                bytes: 50,
                bounded_by_total: true
            }
        );

        budget.commit(50);
        assert_eq!(budget.allowance().bytes, 0);
        assert!(budget.total_bytes() <= 250);
    }

    #[test]
    fn test_first_stop_reason_wins() {
        let mut budget = tight(10, 10, 10);
        assert_eq!(budget.stop(StopReason::TotalBytes), StopReason::TotalBytes);
        assert_eq!(budget.stop(StopReason::FileCount), StopReason::TotalBytes);
        assert_eq!(budget.begin_entry(), Err(StopReason::TotalBytes));
    }

    #[test]
    fn test_declared_size_and_ratio_screening() {
        let budget = ExtractionBudget::new(ResourceLimits::DEFAULT);

        // 1 KB entry declaring 10 GB.
        assert_eq!(
            budget.screen_declared(Some(10 * 1024 * 1024 * 1024), Some(1024)),
            Err(EntrySkip::DeclaredTooLarge)
        );
        // 5 MB from 10 KB is 512:1.
        assert_eq!(
            budget.screen_declared(Some(5 * 1024 * 1024), Some(10 * 1024)),
            Err(EntrySkip::CompressionRatio)
        );
        // Exactly 100:1 is allowed.
        assert_eq!(budget.screen_declared(Some(100_000), Some(1_000)), Ok(()));
        // Unknown sizes defer to the runtime check.
        assert_eq!(budget.screen_declared(None, None), Ok(()));
        assert_eq!(budget.screen_declared(Some(4096), Some(0)), Ok(()));
    }
}
