//! Configuration structures for filesync.
//!
//! This module provides configuration types for all components of the application:
//!
//! - [`SyncConfig`] - Sync engine settings (comparer, retention, parallelism)
//! - [`WatchConfig`] - File watcher settings (debouncing, recursion)
//! - [`IgnoreConfig`] - Extra ignore rules and `.fsignore` discovery
//! - [`Config`] - Root configuration combining all settings with the two roots
//!
//! All configuration types implement [`Default`]. A [`Config`] is only usable
//! once [`Config::validate`] has accepted it.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the sync engine.
///
/// # Examples
///
/// ```
/// use fs_core::SyncConfig;
///
/// let config = SyncConfig::default();
/// assert_eq!(config.max_concurrency, 4);
/// assert!(!config.use_deep_comparer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Compare file contents block by block instead of length and mtime.
    pub use_deep_comparer: bool,

    /// Leave destination files in place when their source disappears.
    pub keep_removed_files: bool,

    /// Maximum number of diff pairs processed at the same time.
    pub max_concurrency: usize,

    /// Compute and report actions without touching the destination.
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            use_deep_comparer: false,
            keep_removed_files: false,
            max_concurrency: 4,
            dry_run: false,
        }
    }
}

/// Configuration for the change watcher.
///
/// # Examples
///
/// ```
/// use fs_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 2000);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether `watch` mode keeps syncing after the initial run.
    pub enabled: bool,

    /// Quiet period in milliseconds.
    ///
    /// A sync fires once no qualifying change has arrived for this long.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000,
            recursive: true,
        }
    }
}

impl WatchConfig {
    /// Returns the debounce window as a [`std::time::Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration for ignore rules.
///
/// # Examples
///
/// ```
/// use fs_core::IgnoreConfig;
///
/// let config = IgnoreConfig::default();
/// assert!(config.patterns.is_empty());
/// assert!(config.load_ignore_files);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Extra rules, appended after every discovered `.fsignore` rule.
    pub patterns: Vec<String>,

    /// Whether to discover `.fsignore` files in the source tree.
    pub load_ignore_files: bool,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            load_ignore_files: true,
        }
    }
}

/// Root configuration for filesync.
///
/// # Examples
///
/// ```
/// use fs_core::Config;
///
/// let config = Config::default();
/// assert!(config.log_file.is_none());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("max_concurrency"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to mirror from.
    pub source: Utf8PathBuf,

    /// Directory to mirror into.
    pub destination: Utf8PathBuf,

    /// Optional log file, written in addition to the console.
    pub log_file: Option<Utf8PathBuf>,

    /// Sync engine configuration.
    pub sync: SyncConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Ignore rule configuration.
    pub ignore: IgnoreConfig,
}

impl Config {
    /// Loads a configuration file in JSON format.
    ///
    /// Missing fields take their default values. The result is not validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        tracing::debug!(path = %path, "loaded configuration");
        Ok(config)
    }

    /// Checks that the configuration describes a runnable sync.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingSetting`] if either root is empty
    /// - [`ConfigError::MissingDirectory`] if either root is not a directory
    /// - [`ConfigError::SameRoots`] if both roots resolve to the same directory
    /// - [`ConfigError::InvalidOption`] if `max_concurrency` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.as_str().is_empty() {
            return Err(ConfigError::MissingSetting("source"));
        }
        if self.destination.as_str().is_empty() {
            return Err(ConfigError::MissingSetting("destination"));
        }
        if self.sync.max_concurrency == 0 {
            return Err(ConfigError::invalid_option(
                "sync.max_concurrency",
                "must be at least 1",
            ));
        }

        let source = canonical_dir(&self.source)?;
        let destination = canonical_dir(&self.destination)?;
        if source == destination {
            return Err(ConfigError::SameRoots(source));
        }

        Ok(())
    }
}

fn canonical_dir(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::MissingDirectory(path.to_owned()));
    }
    path.canonicalize_utf8()
        .map_err(|_| ConfigError::MissingDirectory(path.to_owned()))
}
