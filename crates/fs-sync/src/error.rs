//! Error types for the fs-sync crate.
//!
//! This module provides the [`SyncError`] type for errors that can occur
//! while diffing two trees and applying the result.

use camino::Utf8PathBuf;
use fs_core::FsError;
use fs_ignore::PatternError;

/// Which side of a sync a root belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The tree being mirrored from.
    Source,
    /// The tree being mirrored into.
    Destination,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

/// Errors that can occur during a sync run.
///
/// # Error Recovery Strategy
///
/// - **Missing roots** ([`SyncError::RootMissing`]): Fatal - the run aborts
///   before any pair is touched
/// - **Filesystem errors** ([`SyncError::Fs`]): Log, leave the pair unsynced,
///   continue with the rest
/// - **Verification mismatches** ([`SyncError::VerificationMismatch`]): Log at
///   error level, leave the pair unsynced, never retried
/// - **Pattern and thread pool errors**: Fatal - raised while building the
///   engine
///
/// # Examples
///
/// ```
/// use fs_sync::SyncError;
///
/// let err = SyncError::mismatch("photos/cat.jpg");
/// assert!(err.is_recoverable());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("photos/cat.jpg"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A tree root does not exist.
    #[error("{side} root does not exist: {path}")]
    RootMissing {
        /// Which root is missing.
        side: Side,
        /// The configured root path.
        path: Utf8PathBuf,
    },

    /// A filesystem operation failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// A freshly copied file does not compare equal to its source.
    #[error("copied file does not match its source: {path}")]
    VerificationMismatch {
        /// The relative path of the copied file.
        path: Utf8PathBuf,
    },

    /// The ignore rules could not be built.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The worker pool could not be created.
    #[error("failed to build sync worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SyncError {
    /// Creates a new [`SyncError::RootMissing`] error.
    #[inline]
    pub fn root_missing(side: Side, path: impl Into<Utf8PathBuf>) -> Self {
        Self::RootMissing {
            side,
            path: path.into(),
        }
    }

    /// Creates a new [`SyncError::VerificationMismatch`] error.
    #[inline]
    pub fn mismatch(path: impl Into<Utf8PathBuf>) -> Self {
        Self::VerificationMismatch { path: path.into() }
    }

    /// Returns `true` if this error only affects a single pair.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fs(_) | Self::VerificationMismatch { .. })
    }

    /// Returns `true` if this error stops the whole run.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::RootMissing { path, .. } | Self::VerificationMismatch { path } => Some(path),
            Self::Fs(err) => err.path(),
            Self::Pattern(_) | Self::ThreadPool(_) => None,
        }
    }
}
