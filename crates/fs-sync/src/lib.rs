//! Tree diffing and the sync engine for filesync.
//!
//! This crate computes what differs between a source tree and a destination
//! tree and applies the difference so the destination mirrors the source.
//!
//! # Overview
//!
//! - [`TreeDiffer`]: enumerates both trees, applies the ignore rules, and
//!   returns an immutable [`TreeDiff`]
//! - [`DiffPair`]: one unit of work (add, remove, or update)
//! - [`SyncEngine`]: applies pairs on a bounded rayon pool with atomic
//!   temp-file copies and shadow deletes
//! - [`FileComparer`]: shallow (length and mtime) or deep (BLAKE3) equality
//! - [`SyncReport`] and [`SyncStats`]: what happened
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fs_core::{LocalFileSystem, SyncConfig};
//! use fs_ignore::PathFilter;
//! use fs_sync::SyncEngine;
//!
//! let source = Arc::new(LocalFileSystem::new("/data/src"));
//! let filter = Arc::new(PathFilter::from_tree(source.as_ref())?);
//! let engine = SyncEngine::new(
//!     source,
//!     Arc::new(LocalFileSystem::new("/data/dst")),
//!     filter,
//!     SyncConfig::default(),
//! )?;
//!
//! let report = engine.sync()?;
//! for pair in report.unsynced() {
//!     eprintln!("not synced: {}", pair.path());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod comparer;
pub mod differ;
pub mod engine;
pub mod error;
pub mod ops;
pub mod pair;
pub mod report;
pub mod stats;

pub use comparer::{ComparerKind, DeepComparer, FileComparer, ShallowComparer};
pub use differ::{DiffSummary, TreeDiff, TreeDiffer};
pub use engine::SyncEngine;
pub use error::{Side, SyncError};
pub use pair::{DiffPair, PairKind};
pub use report::SyncReport;
pub use stats::{SyncStats, SyncStatsSnapshot};
