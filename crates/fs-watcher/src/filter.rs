//! Filtering of change events before they reach the debouncer.
//!
//! Filters see paths relative to the watched root. An event is dropped when
//! none of its paths pass.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use fs_ignore::PathFilter;
//! use fs_watcher::{FileFilter, IgnoreFilter};
//!
//! let rules = PathFilter::from_lines(["*.log"]).unwrap();
//! let filter = IgnoreFilter::new(Arc::new(rules));
//!
//! assert!(filter.should_process(Utf8Path::new("src/main.rs")));
//! assert!(!filter.should_process(Utf8Path::new("build/out.log")));
//! assert!(!filter.should_process(Utf8Path::new("src/main.rs.fstmp")));
//! ```

use std::sync::Arc;

use camino::Utf8Path;
use fs_core::path::is_engine_artifact;
use fs_ignore::PathFilter;

/// A predicate deciding which changed paths are worth a sync.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the notify
/// callback thread, and `'static` to be moved there.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change to `path` should be forwarded.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Applies the sync ignore rules and drops the engine's own temp and shadow
/// files.
///
/// Shares its [`PathFilter`] (and so the directory verdict cache) with the
/// [`TreeDiffer`](fs_sync::TreeDiffer) that the triggered syncs use.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    rules: Arc<PathFilter>,
}

impl IgnoreFilter {
    /// Wraps a shared path filter.
    #[must_use]
    pub const fn new(rules: Arc<PathFilter>) -> Self {
        Self { rules }
    }

    /// Returns the wrapped path filter.
    #[must_use]
    pub fn rules(&self) -> &PathFilter {
        &self.rules
    }
}

impl FileFilter for IgnoreFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        !is_engine_artifact(path) && !self.rules.filtered_path(path)
    }
}

impl<F: FileFilter> FileFilter for Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}
