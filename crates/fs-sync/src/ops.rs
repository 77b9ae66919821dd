//! Crash-safe copy, delete, and merge of a single relative path.
//!
//! A copy never exposes a partial file at its final path: bytes go to
//! `<path>.fstmp` first, which is then renamed over the target. A delete
//! renames the target to `<path>.fsrmd` before removing it, so an interrupted
//! delete leaves a recognizable shadow rather than a half-state.

use camino::Utf8Path;
use fs_core::FileSystem;
use fs_core::path::{SHADOW_SUFFIX, TEMP_SUFFIX, with_suffix};

use crate::comparer::{FileComparer, compare_timed};
use crate::error::SyncError;

/// Result of [`copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The file now exists in the destination and verified equal.
    Copied,
    /// The source path is an in-flight temp artifact and was not copied.
    SkippedTemp,
}

/// Copies `rel` from `src_fs` to the same path in `dest_fs`.
///
/// Parent directories are created as needed. After the rename the copy is
/// checked with `comparer`.
///
/// # Errors
///
/// Returns [`SyncError::Fs`] if any step fails (the temp file is removed on a
/// best-effort basis) and [`SyncError::VerificationMismatch`] if the final
/// file does not compare equal to its source.
pub fn copy(
    src_fs: &dyn FileSystem,
    dest_fs: &dyn FileSystem,
    rel: &Utf8Path,
    comparer: &dyn FileComparer,
) -> Result<CopyOutcome, SyncError> {
    if rel.as_str().ends_with(TEMP_SUFFIX) {
        tracing::trace!(path = %rel, "skipping temp artifact");
        return Ok(CopyOutcome::SkippedTemp);
    }

    if let Some(parent) = rel.parent().filter(|p| !p.as_str().is_empty()) {
        dest_fs.create_directory(parent)?;
    }

    let temp = with_suffix(rel, TEMP_SUFFIX);
    let staged = src_fs
        .copy_file_to(rel, dest_fs, &temp, true)
        .and_then(|_| dest_fs.move_file(&temp, rel, true));
    if let Err(err) = staged {
        if dest_fs.file_exists(&temp) {
            if let Err(cleanup) = dest_fs.delete_file(&temp) {
                tracing::debug!(path = %temp, error = %cleanup, "failed to remove temp file");
            }
        }
        return Err(err.into());
    }

    if !compare_timed(comparer, src_fs, dest_fs, rel)? {
        return Err(SyncError::mismatch(rel));
    }
    tracing::trace!(path = %rel, "copied");
    Ok(CopyOutcome::Copied)
}

/// Deletes `rel` from `fs` through a shadow rename.
///
/// Returns `false` if there was nothing to delete.
///
/// # Errors
///
/// Returns [`SyncError::Fs`] if the rename or the removal fails.
pub fn delete(fs: &dyn FileSystem, rel: &Utf8Path) -> Result<bool, SyncError> {
    if !fs.file_exists(rel) {
        return Ok(false);
    }

    if rel.as_str().ends_with(SHADOW_SUFFIX) {
        fs.delete_file(rel)?;
        return Ok(true);
    }

    let shadow = with_suffix(rel, SHADOW_SUFFIX);
    match fs.move_file(rel, &shadow, true) {
        Ok(()) => {}
        // Removed by someone else since the existence check.
        Err(err) if err.is_not_found() => return Ok(false),
        Err(err) => return Err(err.into()),
    }
    fs.delete_file(&shadow)?;
    tracing::trace!(path = %rel, "deleted");
    Ok(true)
}

/// Replaces `rel` in `dest_fs` with the source version: delete, then copy.
///
/// # Errors
///
/// Returns the first error from [`delete`] or [`copy`].
pub fn merge(
    src_fs: &dyn FileSystem,
    dest_fs: &dyn FileSystem,
    rel: &Utf8Path,
    comparer: &dyn FileComparer,
) -> Result<CopyOutcome, SyncError> {
    delete(dest_fs, rel)?;
    copy(src_fs, dest_fs, rel, comparer)
}
