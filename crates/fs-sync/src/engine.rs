//! The sync engine: diff, then apply under bounded parallelism.
//!
//! | source | destination | action |
//! |---|---|---|
//! | absent | present | delete, unless removed files are kept |
//! | present | absent | copy |
//! | present | present | nothing if equal, otherwise merge |
//!
//! Pairs run on a dedicated rayon pool whose width is the configured
//! concurrency. A failing pair is logged and left unsynced; its siblings
//! still run. Cancellation is checked before each pair, never inside one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use camino::Utf8Path;
use fs_core::path::TEMP_SUFFIX;
use fs_core::{FileSystem, SyncConfig};
use fs_ignore::PathFilter;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::comparer::{ComparerKind, FileComparer, compare_timed};
use crate::differ::{TreeDiff, TreeDiffer};
use crate::error::{Side, SyncError};
use crate::ops::{self, CopyOutcome};
use crate::pair::DiffPair;
use crate::report::SyncReport;
use crate::stats::SyncStats;

/// What happened to one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Copied,
    Deleted,
    Merged,
    Unchanged,
    Skipped,
}

/// Mirrors a source tree onto a destination tree.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use fs_core::{LocalFileSystem, SyncConfig};
/// use fs_ignore::PathFilter;
/// use fs_sync::SyncEngine;
///
/// let engine = SyncEngine::new(
///     Arc::new(LocalFileSystem::new("/data/src")),
///     Arc::new(LocalFileSystem::new("/data/dst")),
///     Arc::new(PathFilter::default()),
///     SyncConfig::default(),
/// )?;
///
/// let report = engine.sync()?;
/// println!("{} changed, {} failed", report.stats.changed(), report.stats.failed);
/// # Ok::<(), fs_sync::SyncError>(())
/// ```
#[derive(Debug)]
pub struct SyncEngine {
    source: Arc<dyn FileSystem>,
    dest: Arc<dyn FileSystem>,
    differ: TreeDiffer,
    comparer: Arc<dyn FileComparer>,
    options: SyncConfig,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine for `source` and `dest`.
    ///
    /// The comparer is picked from `options.use_deep_comparer`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ThreadPool`] if the worker pool cannot be built.
    pub fn new(
        source: Arc<dyn FileSystem>,
        dest: Arc<dyn FileSystem>,
        filter: Arc<PathFilter>,
        options: SyncConfig,
    ) -> Result<Self, SyncError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_concurrency.max(1))
            .thread_name(|index| format!("filesync-worker-{index}"))
            .build()?;
        let comparer: Arc<dyn FileComparer> =
            Arc::from(ComparerKind::from_deep_flag(options.use_deep_comparer).build());

        Ok(Self {
            source,
            dest,
            differ: TreeDiffer::new(filter),
            comparer,
            options,
            pool,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the comparer.
    #[must_use]
    pub fn with_comparer(mut self, comparer: Arc<dyn FileComparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Uses `token` to stop runs early.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token observed between pairs.
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The differ used by [`sync`](Self::sync).
    #[inline]
    #[must_use]
    pub fn differ(&self) -> &TreeDiffer {
        &self.differ
    }

    /// The engine settings.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &SyncConfig {
        &self.options
    }

    /// Checks that both roots exist.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RootMissing`] for the first missing root.
    pub fn ensure_roots(&self) -> Result<(), SyncError> {
        let root = Utf8Path::new("");
        if !self.source.directory_exists(root) {
            return Err(SyncError::root_missing(Side::Source, self.source.root()));
        }
        if !self.dest.directory_exists(root) {
            return Err(SyncError::root_missing(Side::Destination, self.dest.root()));
        }
        Ok(())
    }

    /// Diffs the two trees without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RootMissing`] or an enumeration error.
    pub fn diff(&self) -> Result<TreeDiff, SyncError> {
        self.ensure_roots()?;
        self.differ.diff(self.source.as_ref(), self.dest.as_ref())
    }

    /// Runs one full sync.
    ///
    /// Individual pair failures do not fail the run; check
    /// [`SyncReport::is_partial_failure`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RootMissing`] before touching anything if a root
    /// is missing, or an enumeration error from the diff.
    pub fn sync(&self) -> Result<SyncReport, SyncError> {
        info!(
            source = %self.source.root(),
            destination = %self.dest.root(),
            dry_run = self.options.dry_run,
            "starting sync"
        );
        let diff = self.diff()?;
        Ok(self.sync_pairs(diff.into_pairs()))
    }

    /// Applies `pairs` on the worker pool.
    pub fn sync_pairs(&self, mut pairs: Vec<DiffPair>) -> SyncReport {
        let started = Instant::now();
        let stats = SyncStats::new();
        let interrupted = AtomicBool::new(false);

        self.pool.install(|| {
            pairs.par_iter_mut().for_each(|pair| {
                if self.cancel.is_cancelled() {
                    interrupted.store(true, Ordering::Relaxed);
                    return;
                }
                match self.apply(pair) {
                    Ok(action) => {
                        match action {
                            Action::Copied => stats.increment_copied(),
                            Action::Deleted => stats.increment_deleted(),
                            Action::Merged => stats.increment_merged(),
                            Action::Unchanged => stats.increment_unchanged(),
                            Action::Skipped => stats.increment_skipped(),
                        }
                        if !self.options.dry_run {
                            pair.mark_synced();
                        }
                        debug!(path = %pair.path(), ?action, "pair done");
                    }
                    Err(err) => {
                        stats.increment_failed();
                        if matches!(err, SyncError::VerificationMismatch { .. }) {
                            error!(path = %pair.path(), error = %err, "copy verification failed");
                        } else {
                            warn!(path = %pair.path(), error = %err, "failed to sync pair");
                        }
                    }
                }
            });
        });

        let report = SyncReport {
            pairs,
            stats: stats.snapshot(),
            elapsed: started.elapsed(),
            cancelled: interrupted.load(Ordering::Relaxed),
            dry_run: self.options.dry_run,
        };

        let s = &report.stats;
        if report.is_partial_failure() {
            warn!(
                failed = s.failed,
                succeeded = report.synced().count(),
                "sync finished with failures"
            );
        }
        info!(
            copied = s.copied,
            deleted = s.deleted,
            merged = s.merged,
            unchanged = s.unchanged,
            skipped = s.skipped,
            failed = s.failed,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis(),
            "sync completed"
        );
        report
    }

    fn apply(&self, pair: &DiffPair) -> Result<Action, SyncError> {
        let (src_fs, dest_fs) = (self.source.as_ref(), self.dest.as_ref());
        let comparer = self.comparer.as_ref();
        let dry_run = self.options.dry_run;

        match (pair.source(), pair.dest()) {
            (None, None) => Ok(Action::Skipped),
            (None, Some(dest)) => {
                if self.options.keep_removed_files {
                    Ok(Action::Skipped)
                } else if dry_run {
                    Ok(Action::Deleted)
                } else if ops::delete(dest_fs, dest)? {
                    Ok(Action::Deleted)
                } else {
                    Ok(Action::Skipped)
                }
            }
            (Some(src), None) => {
                if dry_run {
                    return Ok(if src.as_str().ends_with(TEMP_SUFFIX) {
                        Action::Skipped
                    } else {
                        Action::Copied
                    });
                }
                Ok(match ops::copy(src_fs, dest_fs, src, comparer)? {
                    CopyOutcome::Copied => Action::Copied,
                    CopyOutcome::SkippedTemp => Action::Skipped,
                })
            }
            (Some(src), Some(_)) => {
                if compare_timed(comparer, src_fs, dest_fs, src)? {
                    return Ok(Action::Unchanged);
                }
                if dry_run {
                    return Ok(Action::Merged);
                }
                Ok(match ops::merge(src_fs, dest_fs, src, comparer)? {
                    CopyOutcome::Copied => Action::Merged,
                    CopyOutcome::SkippedTemp => Action::Skipped,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use fs_core::LocalFileSystem;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        src_dir: TempDir,
        dest_dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                src_dir: TempDir::new().unwrap(),
                dest_dir: TempDir::new().unwrap(),
            }
        }

        fn src(&self) -> &Path {
            self.src_dir.path()
        }

        fn dest(&self) -> &Path {
            self.dest_dir.path()
        }

        fn engine(&self, rules: &[&str], options: SyncConfig) -> SyncEngine {
            let utf8 = |p: &Path| Utf8PathBuf::from_path_buf(p.to_path_buf()).unwrap();
            SyncEngine::new(
                Arc::new(LocalFileSystem::new(utf8(self.src()))),
                Arc::new(LocalFileSystem::new(utf8(self.dest()))),
                Arc::new(PathFilter::from_lines(rules).unwrap()),
                options,
            )
            .unwrap()
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn read(root: &Path, rel: &str) -> Option<String> {
        std::fs::read_to_string(root.join(rel)).ok()
    }

    #[derive(Debug)]
    struct NeverEqual;

    impl FileComparer for NeverEqual {
        fn is_equal(
            &self,
            _: &dyn FileSystem,
            _: &dyn FileSystem,
            _: &Utf8Path,
            _: &Utf8Path,
        ) -> Result<bool, SyncError> {
            Ok(false)
        }
    }

    #[test]
    fn test_sync_mirrors_source() {
        let fx = Fixture::new();
        write(fx.src(), "new.txt", "fresh");
        write(fx.src(), "nested/deep/file.txt", "deep");
        write(fx.src(), "changed.txt", "v2 longer");
        write(fx.dest(), "changed.txt", "v1");
        write(fx.dest(), "stale/old.txt", "gone");

        let report = fx.engine(&[], SyncConfig::default()).sync().unwrap();

        assert_eq!(read(fx.dest(), "new.txt").as_deref(), Some("fresh"));
        assert_eq!(read(fx.dest(), "nested/deep/file.txt").as_deref(), Some("deep"));
        assert_eq!(read(fx.dest(), "changed.txt").as_deref(), Some("v2 longer"));
        assert!(read(fx.dest(), "stale/old.txt").is_none());

        assert_eq!(report.stats.copied, 2);
        assert_eq!(report.stats.merged, 1);
        assert_eq!(report.stats.deleted, 1);
        assert_eq!(report.synced().count(), 4);
        assert!(!report.is_partial_failure());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_second_sync_is_a_no_op() {
        let fx = Fixture::new();
        write(fx.src(), "a.txt", "a");
        write(fx.src(), "b/c.txt", "c");
        let engine = fx.engine(&[], SyncConfig::default());

        engine.sync().unwrap();
        let second = engine.sync().unwrap();
        assert_eq!(second.stats.changed(), 0);
        assert_eq!(second.stats.unchanged, 2);
    }

    #[test]
    fn test_deep_comparer_round_trip() {
        let fx = Fixture::new();
        write(fx.src(), "a.bin", "same length");
        write(fx.dest(), "a.bin", "SAME LENGTH");
        let options = SyncConfig {
            use_deep_comparer: true,
            ..SyncConfig::default()
        };
        let engine = fx.engine(&[], options);

        let first = engine.sync().unwrap();
        assert_eq!(first.stats.merged, 1);
        assert_eq!(read(fx.dest(), "a.bin").as_deref(), Some("same length"));
        assert_eq!(engine.sync().unwrap().stats.unchanged, 1);
    }

    #[test]
    fn test_keep_removed_files() {
        let fx = Fixture::new();
        write(fx.dest(), "only-in-dest.txt", "keep me");
        let options = SyncConfig {
            keep_removed_files: true,
            ..SyncConfig::default()
        };

        let report = fx.engine(&[], options).sync().unwrap();
        assert_eq!(read(fx.dest(), "only-in-dest.txt").as_deref(), Some("keep me"));
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.synced().count(), 1);
    }

    #[test]
    fn test_ignored_paths_are_untouched() {
        let fx = Fixture::new();
        write(fx.src(), "build/out.o", "binary");
        write(fx.src(), "main.c", "int main;");
        write(fx.dest(), "local.log", "dest-only but ignored");

        let report = fx.engine(&["build/", "*.log"], SyncConfig::default()).sync().unwrap();
        assert!(read(fx.dest(), "build/out.o").is_none());
        assert_eq!(read(fx.dest(), "local.log").as_deref(), Some("dest-only but ignored"));
        assert_eq!(report.pairs.len(), 1);
    }

    #[test]
    fn test_missing_root_aborts_before_any_change() {
        let fx = Fixture::new();
        write(fx.src(), "a.txt", "a");
        let missing = fx.dest().join("not-there");
        let engine = SyncEngine::new(
            Arc::new(LocalFileSystem::new(Utf8PathBuf::from_path_buf(fx.src().to_path_buf()).unwrap())),
            Arc::new(LocalFileSystem::new(Utf8PathBuf::from_path_buf(missing.clone()).unwrap())),
            Arc::new(PathFilter::default()),
            SyncConfig::default(),
        )
        .unwrap();

        let err = engine.sync().unwrap_err();
        assert!(matches!(
            err,
            SyncError::RootMissing {
                side: Side::Destination,
                ..
            }
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn test_verification_failure_is_isolated() {
        let fx = Fixture::new();
        write(fx.src(), "copy-me.txt", "data");
        write(fx.dest(), "delete-me.txt", "old");

        let engine = fx
            .engine(&[], SyncConfig::default())
            .with_comparer(Arc::new(NeverEqual));
        let report = engine.sync().unwrap();

        assert!(report.is_partial_failure());
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.deleted, 1);
        let unsynced: Vec<_> = report.unsynced().map(DiffPair::path).collect();
        assert_eq!(unsynced, ["copy-me.txt"]);
    }

    #[test]
    fn test_cancelled_run_touches_nothing() {
        let fx = Fixture::new();
        write(fx.src(), "a.txt", "a");
        let token = CancellationToken::new();
        token.cancel();

        let report = fx
            .engine(&[], SyncConfig::default())
            .with_cancellation(token)
            .sync()
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.stats.total(), 0);
        assert!(read(fx.dest(), "a.txt").is_none());
    }

    #[test]
    fn test_dry_run_plans_without_writing() {
        let fx = Fixture::new();
        write(fx.src(), "a.txt", "a");
        write(fx.dest(), "b.txt", "b");
        let options = SyncConfig {
            dry_run: true,
            ..SyncConfig::default()
        };

        let report = fx.engine(&[], options).sync().unwrap();
        assert!(report.dry_run);
        assert_eq!(report.stats.copied, 1);
        assert_eq!(report.stats.deleted, 1);
        assert!(read(fx.dest(), "a.txt").is_none());
        assert_eq!(read(fx.dest(), "b.txt").as_deref(), Some("b"));
        assert_eq!(report.synced().count(), 0);
    }

    #[test]
    fn test_single_worker_pool() {
        let fx = Fixture::new();
        for i in 0..20 {
            write(fx.src(), &format!("f{i}.txt"), "x");
        }
        let options = SyncConfig {
            max_concurrency: 1,
            ..SyncConfig::default()
        };
        let report = fx.engine(&[], options).sync().unwrap();
        assert_eq!(report.stats.copied, 20);
    }
}
