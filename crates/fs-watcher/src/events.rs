//! Change events emitted by the watcher.
//!
//! # Event Flow
//!
//! ```text
//! notify event (absolute paths)
//!        │
//!        ▼
//!   relative to the watched root, filtered
//!        │
//!        ▼
//!   ChangeEvent sent via channel to the debounce loop
//! ```

use std::path::Path;
use std::time::Instant;

use camino::Utf8PathBuf;
use fs_core::path::to_relative;
use notify::EventKind;
use notify::event::ModifyKind;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::filter::FileFilter;

/// What happened to the paths of a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A file or directory appeared.
    Created,
    /// Contents or metadata changed.
    Changed,
    /// A file or directory disappeared.
    Deleted,
    /// An entry was renamed; `paths` holds whichever ends the platform reported.
    Renamed,
}

impl ChangeKind {
    /// Maps a notify event kind, or `None` for kinds that never warrant a sync
    /// (access notifications and unclassified events).
    #[must_use]
    pub const fn from_notify(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(_) => Some(Self::Changed),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

/// A change inside the watched tree.
///
/// Paths are relative to the watched root and use `/` separators. Most events
/// carry one path; renames may carry two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected paths, relative to the root.
    pub paths: SmallVec<[Utf8PathBuf; 2]>,
    /// When the watcher saw the event.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Creates an event stamped with the current instant.
    #[must_use]
    pub fn new(kind: ChangeKind, paths: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        Self {
            kind,
            paths: paths.into_iter().collect(),
            timestamp: Instant::now(),
        }
    }

    /// Converts a notify event under `root`.
    ///
    /// Paths outside the root, non-UTF-8 paths, and paths rejected by
    /// `filter` are dropped. Returns `None` if the kind does not warrant a sync
    /// or no path survives.
    pub fn from_notify<F: FileFilter + ?Sized>(
        root: &Path,
        filter: &F,
        event: &notify::Event,
    ) -> Option<Self> {
        let kind = ChangeKind::from_notify(event.kind)?;
        let paths: SmallVec<[Utf8PathBuf; 2]> = event
            .paths
            .iter()
            .filter_map(|full| to_relative(root, full))
            .filter(|rel| {
                let keep = filter.should_process(rel);
                if !keep {
                    tracing::trace!(path = %rel, "filtered out change event");
                }
                keep
            })
            .collect();

        if paths.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            paths,
            timestamp: Instant::now(),
        })
    }

    /// Returns the first affected path.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        self.paths.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, IgnoreFilter};
    use fs_ignore::PathFilter;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ChangeKind::from_notify(EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            ChangeKind::from_notify(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Changed)
        );
        assert_eq!(
            ChangeKind::from_notify(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Renamed)
        );
        assert_eq!(
            ChangeKind::from_notify(EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Deleted)
        );
        assert_eq!(ChangeKind::from_notify(EventKind::Access(AccessKind::Any)), None);
    }

    #[test]
    fn test_paths_become_relative() {
        let ev = event(EventKind::Create(CreateKind::File), &["/data/src/a/b.txt"]);
        let change = ChangeEvent::from_notify(Path::new("/data/src"), &AcceptAllFilter, &ev).unwrap();
        assert_eq!(change.kind, ChangeKind::Created);
        assert_eq!(change.path().map(|p| p.as_str()), Some("a/b.txt"));
    }

    #[test]
    fn test_paths_outside_root_are_dropped() {
        let ev = event(EventKind::Remove(RemoveKind::File), &["/elsewhere/x", "/data/src"]);
        assert!(ChangeEvent::from_notify(Path::new("/data/src"), &AcceptAllFilter, &ev).is_none());
    }

    #[test]
    fn test_ignored_paths_are_dropped() {
        let filter = IgnoreFilter::new(Arc::new(PathFilter::from_lines(["*.tmp"]).unwrap()));
        let root = Path::new("/data/src");

        let ignored = event(EventKind::Create(CreateKind::File), &["/data/src/x.tmp"]);
        assert!(ChangeEvent::from_notify(root, &filter, &ignored).is_none());

        let artifact = event(EventKind::Create(CreateKind::File), &["/data/src/x.txt.fstmp"]);
        assert!(ChangeEvent::from_notify(root, &filter, &artifact).is_none());

        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/data/src/x.tmp", "/data/src/x.txt"],
        );
        let change = ChangeEvent::from_notify(root, &filter, &rename).unwrap();
        assert_eq!(change.kind, ChangeKind::Renamed);
        assert_eq!(change.paths.as_slice(), ["x.txt"]);
    }

    #[test]
    fn test_access_events_are_dropped() {
        let ev = event(EventKind::Access(AccessKind::Any), &["/data/src/a"]);
        assert!(ChangeEvent::from_notify(Path::new("/data/src"), &AcceptAllFilter, &ev).is_none());
    }
}
