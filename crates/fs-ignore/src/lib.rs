//! Gitignore-style ignore rules for filesync.
//!
//! This crate turns rule lines into anchored matchers and decides, for each
//! relative path, whether it is excluded from the mirror:
//!
//! - [`PatternCompiler`] - one rule line to one [`Pattern`]
//! - [`PatternSet`] - ordered rules where later matches win
//! - [`PathFilter`] - per-path decisions with a concurrent directory cache
//!
//! # Rule syntax
//!
//! Blank lines and lines starting with `#` are skipped. A leading `!`
//! re-includes. `*` matches within one segment, `**` across segments, `?`
//! one character. A leading `/` anchors to the root, a trailing `/` matches
//! only below a directory, and `\c` matches `c` literally.
//!
//! # Examples
//!
//! ```
//! use fs_ignore::PathFilter;
//!
//! let filter = PathFilter::from_lines([
//!     "*.html",
//!     "!/htmldoc/*.html",
//! ])?;
//!
//! assert!(filter.filtered("Documentation/index.html"));
//! assert!(!filter.filtered("htmldoc/docs.html"));
//! # Ok::<(), fs_ignore::PatternError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod pattern;

pub use error::PatternError;
pub use filter::{IGNORE_FILE_NAME, PathFilter, build_filter};
pub use pattern::{Pattern, PatternCompiler, PatternSet};
