//! The filesystem abstraction used by the differ and the sync engine.
//!
//! Every [`FileSystem`] is rooted at one directory and addresses entries by
//! `/`-separated paths relative to that root (see [`crate::path`]). The sync
//! engine never touches [`std::fs`] directly, which keeps it testable and
//! keeps the two trees symmetric.

mod local;

use std::fs::File;
use std::io::Read;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FsError;

pub use local::LocalFileSystem;

/// Glob accepted by [`FileSystem::enumerate_files`] to list every file.
pub const ALL_FILES: &str = "*";

/// Metadata for a single file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Length in bytes, as reported by the entry itself.
    ///
    /// For a symbolic link this is the length of the link, not its target.
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the entry is a symbolic link.
    pub is_symlink: bool,
}

/// A directory tree addressed by relative paths.
///
/// Implementations must be shareable across the sync engine's worker threads.
/// No operation succeeds silently: a missing entry is reported as
/// [`FsError::NotFound`], an unexpected existing entry as
/// [`FsError::AlreadyExists`].
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// The absolute root of this tree.
    fn root(&self) -> &Utf8Path;

    /// Creates `rel` and all of its missing parents.
    ///
    /// Succeeds if the directory already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_directory(&self, rel: &Utf8Path) -> Result<(), FsError>;

    /// Returns `true` if `rel` is an existing directory. The empty path names
    /// the root.
    fn directory_exists(&self, rel: &Utf8Path) -> bool;

    /// Returns `true` if `rel` is an existing file.
    fn file_exists(&self, rel: &Utf8Path) -> bool;

    /// Lists every file below `rel_dir` whose name matches `glob`.
    ///
    /// The walk is recursive. Returned paths are relative to the root (not to
    /// `rel_dir`) and sorted.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Glob`] for an invalid glob and [`FsError::Walk`] if
    /// traversal fails.
    fn enumerate_files(&self, rel_dir: &Utf8Path, glob: &str)
    -> Result<Vec<Utf8PathBuf>, FsError>;

    /// Opens `rel` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the file does not exist.
    fn open_file(&self, rel: &Utf8Path) -> Result<File, FsError>;

    /// Creates (or truncates) `rel` for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create_file(&self, rel: &Utf8Path) -> Result<File, FsError>;

    /// Reads metadata for `rel` without following symbolic links.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the entry does not exist.
    fn metadata(&self, rel: &Utf8Path) -> Result<FileMetadata, FsError>;

    /// Writes everything from `reader` into `rel`, replacing its contents.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write_file(&self, rel: &Utf8Path, reader: &mut dyn Read) -> Result<u64, FsError>;

    /// Copies `src` to `dst` within this tree.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::AlreadyExists`] if `dst` exists and `overwrite` is
    /// false.
    fn copy_file(&self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), FsError>;

    /// Copies `src` from this tree to `dst` in `dest_fs`, carrying over the
    /// modification time.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::AlreadyExists`] if `dst` exists and `overwrite` is
    /// false, or any error from reading or writing.
    fn copy_file_to(
        &self,
        src: &Utf8Path,
        dest_fs: &dyn FileSystem,
        dst: &Utf8Path,
        overwrite: bool,
    ) -> Result<u64, FsError> {
        if !overwrite && dest_fs.file_exists(dst) {
            return Err(FsError::AlreadyExists(dst.to_owned()));
        }
        let modified = self.metadata(src)?.modified;
        let mut reader = self.open_file(src)?;
        let written = dest_fs.write_file(dst, &mut reader)?;
        dest_fs.set_modified(dst, modified)?;
        Ok(written)
    }

    /// Sets the modification time of the file `rel`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the file does not exist.
    fn set_modified(&self, rel: &Utf8Path, modified: SystemTime) -> Result<(), FsError>;

    /// Renames `src` to `dst` within this tree.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::AlreadyExists`] if `dst` exists and `overwrite` is
    /// false, or [`FsError::NotFound`] if `src` is missing.
    fn move_file(&self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), FsError>;

    /// Deletes the file `rel`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the file does not exist.
    fn delete_file(&self, rel: &Utf8Path) -> Result<(), FsError>;
}
