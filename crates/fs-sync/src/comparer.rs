//! Strategies for deciding whether two files hold the same content.
//!
//! - [`ShallowComparer`] trusts length and modification time
//! - [`DeepComparer`] hashes both files block by block with BLAKE3
//!
//! The engine uses the same comparer to skip unchanged files and to verify a
//! fresh copy, so a comparer must treat a just-copied file as equal to its
//! source.

use std::io::Read;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use fs_core::{FileSystem, FsError};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Comparisons slower than this are logged.
const SLOW_COMPARISON: Duration = Duration::from_millis(500);

/// Decides whether a source file and a destination file are equal.
pub trait FileComparer: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `src` in `src_fs` and `dest` in `dest_fs` are equal.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fs`] if either file cannot be inspected.
    fn is_equal(
        &self,
        src_fs: &dyn FileSystem,
        dest_fs: &dyn FileSystem,
        src: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<bool, SyncError>;
}

/// Which comparer to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparerKind {
    /// Length and modification time.
    #[default]
    Shallow,
    /// Length and block-wise content hash.
    Deep,
}

impl ComparerKind {
    /// Picks the comparer kind for the `use_deep_comparer` setting.
    #[inline]
    #[must_use]
    pub const fn from_deep_flag(deep: bool) -> Self {
        if deep { Self::Deep } else { Self::Shallow }
    }

    /// Creates a comparer of this kind with default settings.
    #[must_use]
    pub fn build(self) -> Box<dyn FileComparer> {
        match self {
            Self::Shallow => Box::new(ShallowComparer::default()),
            Self::Deep => Box::new(DeepComparer::default()),
        }
    }
}

/// Compares length and modification time.
///
/// Modification times may differ by up to [`tolerance`](Self::with_tolerance)
/// (two seconds by default) to absorb coarse timestamp resolution on some
/// filesystems. Symbolic links are compared by the length of what they point
/// to, since that is what a copy produces.
#[derive(Debug, Clone, Copy)]
pub struct ShallowComparer {
    tolerance: Duration,
}

impl Default for ShallowComparer {
    fn default() -> Self {
        Self {
            tolerance: Duration::from_secs(2),
        }
    }
}

impl ShallowComparer {
    /// Sets the allowed modification time difference.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl FileComparer for ShallowComparer {
    fn is_equal(
        &self,
        src_fs: &dyn FileSystem,
        dest_fs: &dyn FileSystem,
        src: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<bool, SyncError> {
        let src_meta = src_fs.metadata(src)?;
        let dest_meta = dest_fs.metadata(dest)?;

        if logical_len(src_fs, src, src_meta)? != logical_len(dest_fs, dest, dest_meta)? {
            return Ok(false);
        }

        let drift = src_meta
            .modified
            .duration_since(dest_meta.modified)
            .or_else(|_| dest_meta.modified.duration_since(src_meta.modified))
            .unwrap_or(Duration::MAX);
        Ok(drift <= self.tolerance)
    }
}

/// Compares content with BLAKE3, one block at a time.
///
/// Lengths are checked first; hashing stops at the first block that differs.
#[derive(Debug, Clone, Copy)]
pub struct DeepComparer {
    block_size: usize,
}

impl Default for DeepComparer {
    fn default() -> Self {
        Self {
            block_size: 10 * 1024 * 1024,
        }
    }
}

impl DeepComparer {
    /// Sets the block size in bytes. Zero is treated as one.
    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = if block_size == 0 { 1 } else { block_size };
        self
    }
}

impl FileComparer for DeepComparer {
    fn is_equal(
        &self,
        src_fs: &dyn FileSystem,
        dest_fs: &dyn FileSystem,
        src: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<bool, SyncError> {
        let src_meta = src_fs.metadata(src)?;
        let dest_meta = dest_fs.metadata(dest)?;
        if logical_len(src_fs, src, src_meta)? != logical_len(dest_fs, dest, dest_meta)? {
            return Ok(false);
        }

        let mut src_file = src_fs.open_file(src)?;
        let mut dest_file = dest_fs.open_file(dest)?;
        let mut src_buf = vec![0u8; self.block_size];
        let mut dest_buf = vec![0u8; self.block_size];

        loop {
            let src_read = read_block(&mut src_file, &mut src_buf).map_err(|e| FsError::from_io(src, e))?;
            let dest_read =
                read_block(&mut dest_file, &mut dest_buf).map_err(|e| FsError::from_io(dest, e))?;
            if src_read != dest_read {
                return Ok(false);
            }
            if src_read == 0 {
                return Ok(true);
            }
            if blake3::hash(&src_buf[..src_read]) != blake3::hash(&dest_buf[..dest_read]) {
                return Ok(false);
            }
        }
    }
}

/// Runs `comparer` and logs comparisons slower than 500 ms.
///
/// # Errors
///
/// Returns whatever the comparer returns.
pub fn compare_timed(
    comparer: &dyn FileComparer,
    src_fs: &dyn FileSystem,
    dest_fs: &dyn FileSystem,
    path: &Utf8Path,
) -> Result<bool, SyncError> {
    let started = Instant::now();
    let result = comparer.is_equal(src_fs, dest_fs, path, path);
    let elapsed = started.elapsed();
    if elapsed > SLOW_COMPARISON {
        tracing::debug!(path = %path, elapsed_ms = elapsed.as_millis(), "slow comparison");
    }
    result
}

/// Length of the content a read of `rel` yields.
fn logical_len(
    fs: &dyn FileSystem,
    rel: &Utf8Path,
    meta: fs_core::FileMetadata,
) -> Result<u64, SyncError> {
    if !meta.is_symlink {
        return Ok(meta.len);
    }
    let file = fs.open_file(rel)?;
    let meta = file.metadata().map_err(|e| FsError::from_io(rel, e))?;
    Ok(meta.len())
}

/// Fills `buf` as far as the reader allows; returns the bytes read.
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
