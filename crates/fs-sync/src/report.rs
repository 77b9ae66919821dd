//! The outcome of one sync run.

use std::time::Duration;

use crate::pair::DiffPair;
use crate::stats::SyncStatsSnapshot;

/// Everything a caller needs to know after [`SyncEngine::sync`](crate::SyncEngine::sync).
///
/// `pairs` keeps every work item with its `synced` flag, so callers can list
/// exactly which paths did not make it.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Every pair the run considered.
    pub pairs: Vec<DiffPair>,
    /// Outcome counters.
    pub stats: SyncStatsSnapshot,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Whether cancellation stopped the run before every pair was attempted.
    pub cancelled: bool,
    /// Whether the run only planned actions.
    pub dry_run: bool,
}

impl SyncReport {
    /// Returns `true` if at least one pair failed.
    #[inline]
    #[must_use]
    pub const fn is_partial_failure(&self) -> bool {
        self.stats.failed > 0
    }

    /// Pairs that finished successfully.
    pub fn synced(&self) -> impl Iterator<Item = &DiffPair> {
        self.pairs.iter().filter(|pair| pair.is_synced())
    }

    /// Pairs that failed, were cancelled, or were only planned.
    pub fn unsynced(&self) -> impl Iterator<Item = &DiffPair> {
        self.pairs.iter().filter(|pair| !pair.is_synced())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_by_synced() {
        let mut done = DiffPair::added("a");
        done.mark_synced();
        let report = SyncReport {
            pairs: vec![done, DiffPair::removed("b")],
            ..SyncReport::default()
        };
        assert_eq!(report.synced().count(), 1);
        assert_eq!(report.unsynced().map(DiffPair::path).collect::<Vec<_>>(), ["b"]);
        assert!(!report.is_partial_failure());
    }

    #[test]
    fn test_partial_failure() {
        let report = SyncReport {
            stats: SyncStatsSnapshot {
                failed: 1,
                ..SyncStatsSnapshot::default()
            },
            ..SyncReport::default()
        };
        assert!(report.is_partial_failure());
    }
}
