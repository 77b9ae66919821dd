//! Core types, errors, and the filesystem abstraction for filesync.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Error types for configuration and filesystem operations
//! - Configuration structures ([`Config`] and its sections)
//! - The [`FileSystem`] trait and its local-disk implementation
//! - Relative path helpers and the engine's reserved suffixes
//! - Type aliases for `FxHashMap`/`FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fs;
pub mod path;

pub use config::{Config, IgnoreConfig, SyncConfig, WatchConfig};
pub use error::{ConfigError, FsError};
pub use fs::{ALL_FILES, FileMetadata, FileSystem, LocalFileSystem};

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;
