//! Relative path helpers.
//!
//! Every path that crosses a crate boundary in filesync is relative to a tree
//! root, uses `/` as its separator, and never starts with a separator. The
//! helpers here produce and check paths of that shape.

use std::path::{Component, Path};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FsError;

/// Suffix of the in-flight copy target written before the final rename.
pub const TEMP_SUFFIX: &str = ".fstmp";

/// Suffix of the shadow a file is renamed to before it is deleted.
pub const SHADOW_SUFFIX: &str = ".fsrmd";

/// Converts `full` into a `/`-separated path relative to `root`.
///
/// Returns `None` if `full` is not under `root`, equals `root`, or is not
/// valid UTF-8.
///
/// # Examples
///
/// ```
/// use fs_core::path::to_relative;
/// use std::path::Path;
///
/// let rel = to_relative(Path::new("/data/src"), Path::new("/data/src/a/b.txt"));
/// assert_eq!(rel.as_deref().map(|p| p.as_str()), Some("a/b.txt"));
/// assert!(to_relative(Path::new("/data/src"), Path::new("/elsewhere")).is_none());
/// ```
#[must_use]
pub fn to_relative(root: &Path, full: &Path) -> Option<Utf8PathBuf> {
    let stripped = full.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in stripped.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part.to_str()?);
    }
    if out.is_empty() {
        None
    } else {
        Some(Utf8PathBuf::from(out))
    }
}

/// Checks that `rel` is a usable relative path.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] if the path is empty, absolute, or
/// contains a `..` component.
pub fn check_relative(rel: &Utf8Path) -> Result<(), FsError> {
    let invalid = |reason| FsError::InvalidPath {
        path: rel.to_owned(),
        reason,
    };
    if rel.as_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    if rel.is_absolute() || rel.as_str().starts_with('/') {
        return Err(invalid("path must be relative to the tree root"));
    }
    if rel
        .components()
        .any(|c| matches!(c, camino::Utf8Component::ParentDir))
    {
        return Err(invalid("path escapes the tree root"));
    }
    Ok(())
}

/// Appends `suffix` to the final segment of `rel`.
///
/// # Examples
///
/// ```
/// use fs_core::path::{with_suffix, TEMP_SUFFIX};
/// use camino::Utf8Path;
///
/// assert_eq!(with_suffix(Utf8Path::new("a/b.txt"), TEMP_SUFFIX), "a/b.txt.fstmp");
/// ```
#[must_use]
pub fn with_suffix(rel: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let mut text = rel.as_str().to_owned();
    text.push_str(suffix);
    Utf8PathBuf::from(text)
}

/// Returns `true` for paths the sync engine creates transiently.
#[inline]
#[must_use]
pub fn is_engine_artifact(rel: &Utf8Path) -> bool {
    let text = rel.as_str();
    text.ends_with(TEMP_SUFFIX) || text.ends_with(SHADOW_SUFFIX)
}

/// Splits `rel` into its parent directory text and its final segment.
///
/// The parent is `None` for entries directly under the root.
///
/// # Examples
///
/// ```
/// use fs_core::path::split_parent;
///
/// assert_eq!(split_parent("a/b/c.txt"), (Some("a/b"), "c.txt"));
/// assert_eq!(split_parent("c.txt"), (None, "c.txt"));
/// ```
#[must_use]
pub fn split_parent(rel: &str) -> (Option<&str>, &str) {
    let trimmed = rel.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => (Some(&trimmed[..idx]), &trimmed[idx + 1..]),
        None => (None, trimmed),
    }
}
