//! Diff pairs: one unit of sync work.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// What a [`DiffPair`] asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Present in the source only: copy it over.
    Add,
    /// Present in the destination only: delete it (unless kept).
    Remove,
    /// Present in both: compare, and replace if they differ.
    Update,
}

/// A source entry, a destination entry, or both, at the same relative path.
///
/// A pair always has at least one side. `synced` is only set by the sync
/// engine once the pair's action succeeded.
///
/// # Examples
///
/// ```
/// use fs_sync::{DiffPair, PairKind};
///
/// let pair = DiffPair::added("docs/readme.md");
/// assert_eq!(pair.kind(), PairKind::Add);
/// assert!(pair.dest().is_none());
/// assert!(!pair.is_synced());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffPair {
    source: Option<Utf8PathBuf>,
    dest: Option<Utf8PathBuf>,
    synced: bool,
}

impl DiffPair {
    /// A pair for an entry that exists only in the source.
    #[must_use]
    pub fn added(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            dest: None,
            synced: false,
        }
    }

    /// A pair for an entry that exists only in the destination.
    #[must_use]
    pub fn removed(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: None,
            dest: Some(path.into()),
            synced: false,
        }
    }

    /// A pair for an entry that exists on both sides.
    #[must_use]
    pub fn common(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        Self {
            source: Some(path.clone()),
            dest: Some(path),
            synced: false,
        }
    }

    /// The source side, if present.
    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    /// The destination side, if present.
    #[inline]
    #[must_use]
    pub fn dest(&self) -> Option<&Utf8Path> {
        self.dest.as_deref()
    }

    /// The relative path this pair is about.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match (&self.source, &self.dest) {
            (Some(path), _) | (None, Some(path)) => path,
            // Unreachable through the constructors.
            (None, None) => Utf8Path::new(""),
        }
    }

    /// What the engine should do with this pair.
    #[must_use]
    pub const fn kind(&self) -> PairKind {
        match (&self.source, &self.dest) {
            (Some(_), None) => PairKind::Add,
            (None, _) => PairKind::Remove,
            (Some(_), Some(_)) => PairKind::Update,
        }
    }

    /// Whether the engine finished this pair successfully.
    #[inline]
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    pub(crate) fn mark_synced(&mut self) {
        self.synced = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_kinds() {
        assert_eq!(DiffPair::added("a").kind(), PairKind::Add);
        assert_eq!(DiffPair::removed("a").kind(), PairKind::Remove);
        assert_eq!(DiffPair::common("a").kind(), PairKind::Update);
    }

    #[test]
    fn test_pair_path_prefers_source() {
        assert_eq!(DiffPair::removed("gone.txt").path(), "gone.txt");
        assert_eq!(DiffPair::common("both.txt").path(), "both.txt");
    }

    #[test]
    fn test_pair_serializes_sides() {
        let json = serde_json::to_string(&DiffPair::removed("x")).unwrap();
        assert_eq!(json, r#"{"source":null,"dest":"x","synced":false}"#);
    }
}
