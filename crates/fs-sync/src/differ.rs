//! Three-way diff of a source tree against a destination tree.
//!
//! [`TreeDiffer::diff`] enumerates both trees, drops every path the
//! [`PathFilter`] excludes, and splits the rest into source-only,
//! destination-only, and common entries. The result is an immutable
//! [`TreeDiff`] value.
//!
//! # Design
//!
//! Enumeration of the two trees runs on both halves of a `rayon::join`, and
//! filtering uses `par_iter`, since filtering is a pure function of the path
//! for a fixed rule set.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use fs_core::{ALL_FILES, FileSystem, FxHashSet};
use fs_ignore::PathFilter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::pair::DiffPair;

/// Computes [`TreeDiff`]s under a shared [`PathFilter`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use fs_core::LocalFileSystem;
/// use fs_ignore::PathFilter;
/// use fs_sync::TreeDiffer;
///
/// let differ = TreeDiffer::new(Arc::new(PathFilter::from_lines(["*.tmp"])?));
/// let diff = differ.diff(
///     &LocalFileSystem::new("/data/src"),
///     &LocalFileSystem::new("/data/dst"),
/// )?;
/// println!("{} to add, {} to remove", diff.added().len(), diff.removed().len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeDiffer {
    filter: Arc<PathFilter>,
}

impl TreeDiffer {
    /// Creates a differ that skips everything `filter` excludes.
    #[must_use]
    pub fn new(filter: Arc<PathFilter>) -> Self {
        Self { filter }
    }

    /// The filter applied to both trees.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Diffs `source` against `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fs`] if either tree cannot be enumerated.
    pub fn diff(&self, source: &dyn FileSystem, dest: &dyn FileSystem) -> Result<TreeDiff, SyncError> {
        let (source_files, dest_files) = rayon::join(
            || self.collect(source),
            || self.collect(dest),
        );
        let source_files = source_files?;
        let dest_files = dest_files?;

        let dest_set: FxHashSet<&Utf8Path> = dest_files.iter().map(Utf8PathBuf::as_path).collect();
        let source_set: FxHashSet<&Utf8Path> =
            source_files.iter().map(Utf8PathBuf::as_path).collect();

        let mut added = Vec::new();
        let mut common = Vec::new();
        for path in &source_files {
            if dest_set.contains(path.as_path()) {
                common.push(path.clone());
            } else {
                added.push(path.clone());
            }
        }
        let mut removed: Vec<Utf8PathBuf> = dest_files
            .iter()
            .filter(|path| !source_set.contains(path.as_path()))
            .cloned()
            .collect();

        added.sort_unstable();
        removed.sort_unstable();
        common.sort_unstable();

        let diff = TreeDiff {
            added,
            removed,
            common,
        };
        tracing::debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            common = diff.common.len(),
            "computed tree diff"
        );
        Ok(diff)
    }

    /// Enumerates every file under `fs` and drops filtered paths.
    fn collect(&self, fs: &dyn FileSystem) -> Result<Vec<Utf8PathBuf>, SyncError> {
        let files = fs.enumerate_files(Utf8Path::new(""), ALL_FILES)?;
        let total = files.len();
        let kept: Vec<Utf8PathBuf> = files
            .into_par_iter()
            .filter(|path| !self.filter.filtered_path(path))
            .collect();
        tracing::trace!(root = %fs.root(), total, kept = kept.len(), "enumerated tree");
        Ok(kept)
    }
}

/// The result of diffing two trees.
///
/// Each list is sorted and holds relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    added: Vec<Utf8PathBuf>,
    removed: Vec<Utf8PathBuf>,
    common: Vec<Utf8PathBuf>,
}

impl TreeDiff {
    /// Paths present only in the source.
    #[inline]
    #[must_use]
    pub fn added(&self) -> &[Utf8PathBuf] {
        &self.added
    }

    /// Paths present only in the destination.
    #[inline]
    #[must_use]
    pub fn removed(&self) -> &[Utf8PathBuf] {
        &self.removed
    }

    /// Paths present in both trees.
    #[inline]
    #[must_use]
    pub fn common(&self) -> &[Utf8PathBuf] {
        &self.common
    }

    /// Total number of pairs this diff turns into.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.common.len()
    }

    /// Returns `true` if neither tree has any unfiltered file.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts per group.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added.len(),
            removed: self.removed.len(),
            common: self.common.len(),
        }
    }

    /// Turns the diff into work items: additions, then removals, then
    /// common entries.
    #[must_use]
    pub fn into_pairs(self) -> Vec<DiffPair> {
        let mut pairs = Vec::with_capacity(self.len());
        pairs.extend(self.added.into_iter().map(DiffPair::added));
        pairs.extend(self.removed.into_iter().map(DiffPair::removed));
        pairs.extend(self.common.into_iter().map(DiffPair::common));
        pairs
    }
}

/// Per-group counts of a [`TreeDiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Source-only entries.
    pub added: usize,
    /// Destination-only entries.
    pub removed: usize,
    /// Entries on both sides.
    pub common: usize,
}
