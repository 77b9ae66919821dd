//! Error types for the fs-watcher crate.

use camino::Utf8PathBuf;
use fs_sync::SyncError;

/// Errors that can occur while watching the source tree.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the watcher cannot start
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - the root must exist
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
/// - **Triggered sync failed** ([`WatchError::Trigger`]): Recoverable - logged,
///   the next quiet period tries again
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watched root does not exist or is not a directory.
    #[error("watch root does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watcher thread went away before reporting back.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// An I/O error occurred while resolving the root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sync started by the watcher failed.
    #[error("triggered sync failed: {0}")]
    Trigger(#[from] SyncError),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Trigger(err) => err.path(),
            Self::Notify(_) | Self::ChannelClosed | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_sync::Side;

    #[test]
    fn test_path_not_found() {
        let err = WatchError::path_not_found("/gone");
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/gone"));
        assert_eq!(err.to_string(), "watch root does not exist: /gone");
    }

    #[test]
    fn test_trigger_is_recoverable() {
        let err = WatchError::from(SyncError::root_missing(Side::Destination, "/mnt/backup"));
        assert!(err.is_recoverable());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/mnt/backup"));
        assert!(err.to_string().starts_with("triggered sync failed"));
    }

    #[test]
    fn test_channel_closed() {
        let err = WatchError::ChannelClosed;
        assert!(err.is_fatal());
        assert!(err.path().is_none());
    }
}
