//! Sync statistics with atomic counters.
//!
//! This module provides [`SyncStats`] for counting outcomes while pairs are
//! processed on the worker pool, and [`SyncStatsSnapshot`] for reporting.
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](Ordering::Relaxed)
//! ordering; they are only read after the pool has finished.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one sync run.
///
/// # Examples
///
/// ```
/// use fs_sync::SyncStats;
///
/// let stats = SyncStats::new();
/// stats.increment_copied();
/// stats.increment_failed();
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.copied, 1);
/// assert_eq!(snap.total(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SyncStats {
    copied: AtomicU64,
    deleted: AtomicU64,
    merged: AtomicU64,
    unchanged: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl SyncStats {
    /// Creates a new [`SyncStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a source file copied to a new destination path.
    #[inline]
    pub fn increment_copied(&self) {
        self.copied.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a destination file removed because its source is gone.
    #[inline]
    pub fn increment_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a changed file replaced in the destination.
    #[inline]
    pub fn increment_merged(&self) {
        self.merged.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a pair that already compared equal.
    #[inline]
    pub fn increment_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a pair left alone on purpose.
    #[inline]
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a pair whose action failed.
    #[inline]
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            copied: self.copied.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStatsSnapshot {
    /// Files copied to new destination paths.
    pub copied: u64,
    /// Destination files deleted.
    pub deleted: u64,
    /// Changed files replaced.
    pub merged: u64,
    /// Pairs already equal.
    pub unchanged: u64,
    /// Pairs left alone on purpose (kept removals, temp artifacts).
    pub skipped: u64,
    /// Pairs whose action failed.
    pub failed: u64,
}

impl SyncStatsSnapshot {
    /// Number of pairs accounted for.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.copied + self.deleted + self.merged + self.unchanged + self.skipped + self.failed
    }

    /// Number of pairs that changed the destination.
    #[inline]
    #[must_use]
    pub const fn changed(&self) -> u64 {
        self.copied + self.deleted + self.merged
    }
}
