//! Error types for the fs-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading and
//! validation, and [`FsError`] for operations performed through the
//! [`FileSystem`](crate::FileSystem) abstraction.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// Every variant is fatal: the process cannot start a sync without a valid
/// pair of roots and sane engine settings.
///
/// # Examples
///
/// ```
/// use fs_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required root was not configured.
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),

    /// A configured root does not exist or is not a directory.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// Source and destination resolve to the same directory.
    #[error("destination must differ from source: {0}")]
    SameRoots(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by [`FileSystem`](crate::FileSystem) operations.
///
/// The filesystem layer never succeeds silently: a missing file, an
/// unexpected existing file, and a generic I/O failure are distinct
/// conditions so that callers can decide which ones are benign.
///
/// # Error Recovery Strategy
///
/// All variants are recoverable at the sync level. The owning diff pair is
/// left unsynced and sibling pairs continue.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(Utf8PathBuf),

    /// The path already exists and overwriting was not requested.
    #[error("already exists: {0}")]
    AlreadyExists(Utf8PathBuf),

    /// The path is not valid for this filesystem (absolute, escapes the
    /// root, or not UTF-8).
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: Utf8PathBuf,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path the operation was acting on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Directory enumeration failed.
    #[error("failed to enumerate {path}: {source}")]
    Walk {
        /// The directory being enumerated.
        path: Utf8PathBuf,
        /// The underlying walker error.
        #[source]
        source: ignore::Error,
    },

    /// The enumeration glob could not be compiled.
    #[error("invalid glob '{glob}': {source}")]
    Glob {
        /// The glob text.
        glob: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },
}

impl FsError {
    /// Maps a [`std::io::Error`] onto the matching variant for `path`.
    ///
    /// `NotFound` and `AlreadyExists` kinds get their own variants; every
    /// other kind becomes [`FsError::Io`].
    pub fn from_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source },
        }
    }

    /// Returns `true` if this error means the path does not exist.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::NotFound(path)
            | Self::AlreadyExists(path)
            | Self::InvalidPath { path, .. }
            | Self::Io { path, .. }
            | Self::Walk { path, .. } => Some(path),
            Self::Glob { .. } => None,
        }
    }
}
