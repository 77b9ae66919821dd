//! Change watching for filesync.
//!
//! The watcher subscribes to notify events under the source root, drops the
//! ones the ignore rules (or the engine's own temp files) account for, and
//! debounces the rest into sync runs that never overlap.
//!
//! # Overview
//!
//! - [`ChangeWatcher`]: notify on a blocking thread, bridged into a tokio
//!   channel of [`ChangeEvent`]s with root-relative paths
//! - [`FileFilter`] / [`IgnoreFilter`]: which changes matter
//! - [`Debouncer`]: one deadline, reset by every qualifying event
//! - [`SyncTrigger`]: one sync in flight, at most one trailing run queued
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use fs_core::{LocalFileSystem, SyncConfig, WatchConfig};
//! use fs_ignore::PathFilter;
//! use fs_sync::SyncEngine;
//! use fs_watcher::{ChangeWatcher, IgnoreFilter, SyncTrigger};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(LocalFileSystem::new("/data/src"));
//! let filter = Arc::new(PathFilter::from_tree(source.as_ref())?);
//! let engine = SyncEngine::new(
//!     source,
//!     Arc::new(LocalFileSystem::new("/data/dst")),
//!     Arc::clone(&filter),
//!     SyncConfig::default(),
//! )?;
//!
//! let cancel = CancellationToken::new();
//! let trigger = SyncTrigger::new(Arc::new(engine), cancel.clone());
//! let config = WatchConfig::default();
//! let mut watcher =
//!     ChangeWatcher::new(Utf8Path::new("/data/src"), IgnoreFilter::new(filter), &config).await?;
//!
//! watcher.run(&trigger).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Startup failures come back as [`WatchError`]. A failed triggered sync is
//! logged as [`WatchError::Trigger`] and the loop keeps going.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod debounce;
pub mod error;
pub mod events;
pub mod filter;
pub mod trigger;
pub mod watcher;

pub use debounce::Debouncer;
pub use error::WatchError;
pub use events::{ChangeEvent, ChangeKind};
pub use filter::{AcceptAllFilter, FileFilter, IgnoreFilter};
pub use trigger::{LoopExit, SyncRunner, SyncTrigger, TriggerStats, debounce_loop};
pub use watcher::ChangeWatcher;
