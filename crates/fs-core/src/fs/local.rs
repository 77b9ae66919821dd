//! [`FileSystem`] over the local disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use globset::Glob;
use ignore::WalkBuilder;

use super::{FileMetadata, FileSystem};
use crate::error::FsError;
use crate::path::{check_relative, to_relative};

/// A directory tree on the local disk.
///
/// # Examples
///
/// ```no_run
/// use fs_core::{FileSystem, LocalFileSystem};
/// use camino::Utf8Path;
///
/// let fs = LocalFileSystem::new("/data/source");
/// let files = fs.enumerate_files(Utf8Path::new(""), "*.txt")?;
/// # Ok::<(), fs_core::FsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: Utf8PathBuf,
}

impl LocalFileSystem {
    /// Creates a filesystem rooted at `root`. The directory is not required
    /// to exist yet.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a relative file path against the root.
    fn resolve(&self, rel: &Utf8Path) -> Result<Utf8PathBuf, FsError> {
        check_relative(rel)?;
        Ok(self.root.join(rel))
    }

    /// Like [`Self::resolve`] but the empty path names the root itself.
    fn resolve_dir(&self, rel: &Utf8Path) -> Result<Utf8PathBuf, FsError> {
        if rel.as_str().is_empty() {
            Ok(self.root.clone())
        } else {
            self.resolve(rel)
        }
    }
}

fn ensure_writable(rel: &Utf8Path, full: &Utf8Path, overwrite: bool) -> Result<(), FsError> {
    if !overwrite && full.symlink_metadata().is_ok() {
        return Err(FsError::AlreadyExists(rel.to_owned()));
    }
    Ok(())
}

impl FileSystem for LocalFileSystem {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn create_directory(&self, rel: &Utf8Path) -> Result<(), FsError> {
        let full = self.resolve_dir(rel)?;
        match fs::create_dir_all(&full) {
            Ok(()) => Ok(()),
            // Another worker created it between our checks.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && full.is_dir() => Ok(()),
            Err(err) => Err(FsError::from_io(rel, err)),
        }
    }

    fn directory_exists(&self, rel: &Utf8Path) -> bool {
        self.resolve_dir(rel).is_ok_and(|full| full.is_dir())
    }

    fn file_exists(&self, rel: &Utf8Path) -> bool {
        self.resolve(rel)
            .ok()
            .and_then(|full| full.symlink_metadata().ok())
            .is_some_and(|meta| !meta.is_dir())
    }

    fn enumerate_files(
        &self,
        rel_dir: &Utf8Path,
        glob: &str,
    ) -> Result<Vec<Utf8PathBuf>, FsError> {
        let matcher = Glob::new(glob)
            .map_err(|source| FsError::Glob {
                glob: glob.to_owned(),
                source,
            })?
            .compile_matcher();
        let dir = self.resolve_dir(rel_dir)?;
        if !dir.is_dir() {
            return Err(FsError::NotFound(rel_dir.to_owned()));
        }

        let walker = WalkBuilder::new(&dir)
            // Mirror everything: no gitignore, no hidden-file skipping
            .standard_filters(false)
            .follow_links(false)
            .threads(1)
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = result.map_err(|source| FsError::Walk {
                path: rel_dir.to_owned(),
                source,
            })?;
            if entry.file_type().is_none_or(|ft| ft.is_dir()) {
                continue;
            }
            if !matcher.is_match(entry.file_name()) {
                continue;
            }
            let rel = to_relative(self.root.as_std_path(), entry.path()).ok_or_else(|| {
                FsError::InvalidPath {
                    path: Utf8PathBuf::from(entry.path().to_string_lossy().into_owned()),
                    reason: "path is not valid UTF-8 or lies outside the root",
                }
            })?;
            files.push(rel);
        }

        files.sort_unstable();
        tracing::trace!(root = %self.root, dir = %rel_dir, count = files.len(), "enumerated files");
        Ok(files)
    }

    fn open_file(&self, rel: &Utf8Path) -> Result<File, FsError> {
        let full = self.resolve(rel)?;
        File::open(&full).map_err(|err| FsError::from_io(rel, err))
    }

    fn create_file(&self, rel: &Utf8Path) -> Result<File, FsError> {
        let full = self.resolve(rel)?;
        File::create(&full).map_err(|err| FsError::from_io(rel, err))
    }

    fn metadata(&self, rel: &Utf8Path) -> Result<FileMetadata, FsError> {
        let full = self.resolve(rel)?;
        let meta = full
            .symlink_metadata()
            .map_err(|err| FsError::from_io(rel, err))?;
        let modified = meta.modified().map_err(|err| FsError::from_io(rel, err))?;
        Ok(FileMetadata {
            len: meta.len(),
            modified,
            is_symlink: meta.file_type().is_symlink(),
        })
    }

    fn write_file(&self, rel: &Utf8Path, reader: &mut dyn Read) -> Result<u64, FsError> {
        let mut file = self.create_file(rel)?;
        let written = io::copy(reader, &mut file).map_err(|err| FsError::from_io(rel, err))?;
        file.sync_all().map_err(|err| FsError::from_io(rel, err))?;
        Ok(written)
    }

    fn set_modified(&self, rel: &Utf8Path, modified: SystemTime) -> Result<(), FsError> {
        let full = self.resolve(rel)?;
        let file = OpenOptions::new()
            .write(true)
            .open(&full)
            .map_err(|err| FsError::from_io(rel, err))?;
        file.set_modified(modified)
            .map_err(|err| FsError::from_io(rel, err))
    }

    fn copy_file(&self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), FsError> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        ensure_writable(dst, &to, overwrite)?;
        fs::copy(&from, &to).map_err(|err| FsError::from_io(src, err))?;
        Ok(())
    }

    fn move_file(&self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), FsError> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        ensure_writable(dst, &to, overwrite)?;
        fs::rename(&from, &to).map_err(|err| FsError::from_io(src, err))
    }

    fn delete_file(&self, rel: &Utf8Path) -> Result<(), FsError> {
        let full = self.resolve(rel)?;
        fs::remove_file(&full).map_err(|err| FsError::from_io(rel, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalFileSystem) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, LocalFileSystem::new(root))
    }

    fn write(fs: &LocalFileSystem, rel: &str, contents: &str) {
        let rel = Utf8Path::new(rel);
        if let Some(parent) = rel.parent() {
            fs.create_directory(parent).unwrap();
        }
        fs.write_file(rel, &mut contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_enumerate_is_recursive_and_sorted() {
        let (_dir, fs) = setup();
        write(&fs, "b.txt", "b");
        write(&fs, "a/deep/c.txt", "c");
        write(&fs, ".hidden", "h");
        fs.create_directory(Utf8Path::new("empty")).unwrap();

        let files = fs.enumerate_files(Utf8Path::new(""), "*").unwrap();
        assert_eq!(files, vec![".hidden", "a/deep/c.txt", "b.txt"]);
    }

    #[test]
    fn test_enumerate_glob_matches_file_name() {
        let (_dir, fs) = setup();
        write(&fs, "x/one.txt", "1");
        write(&fs, "x/two.log", "2");

        let files = fs.enumerate_files(Utf8Path::new("x"), "*.txt").unwrap();
        assert_eq!(files, vec!["x/one.txt"]);
    }

    #[test]
    fn test_enumerate_missing_dir() {
        let (_dir, fs) = setup();
        let err = fs.enumerate_files(Utf8Path::new("nope"), "*").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_move_without_overwrite_fails_when_target_exists() {
        let (_dir, fs) = setup();
        write(&fs, "a.txt", "a");
        write(&fs, "b.txt", "b");

        let err = fs
            .move_file(Utf8Path::new("a.txt"), Utf8Path::new("b.txt"), false)
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));

        fs.move_file(Utf8Path::new("a.txt"), Utf8Path::new("b.txt"), true)
            .unwrap();
        assert!(!fs.file_exists(Utf8Path::new("a.txt")));
        let mut text = String::new();
        fs.open_file(Utf8Path::new("b.txt"))
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "a");
    }

    #[test]
    fn test_copy_file_to_other_root() {
        let (_src_dir, src) = setup();
        let (_dst_dir, dst) = setup();
        write(&src, "data.bin", "payload");

        let copied = src
            .copy_file_to(Utf8Path::new("data.bin"), &dst, Utf8Path::new("data.bin"), false)
            .unwrap();
        assert_eq!(copied, 7);
        let src_meta = src.metadata(Utf8Path::new("data.bin")).unwrap();
        let dst_meta = dst.metadata(Utf8Path::new("data.bin")).unwrap();
        assert_eq!(dst_meta.len, 7);
        assert_eq!(dst_meta.modified, src_meta.modified);

        let err = src
            .copy_file_to(Utf8Path::new("data.bin"), &dst, Utf8Path::new("data.bin"), false)
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[test]
    fn test_copy_file_within_root() {
        let (_dir, fs) = setup();
        write(&fs, "a/orig.txt", "first");
        write(&fs, "a/other.txt", "old");

        fs.copy_file(Utf8Path::new("a/orig.txt"), Utf8Path::new("a/copy.txt"), false)
            .unwrap();
        let copied = std::fs::read_to_string(fs.root().join("a/copy.txt")).unwrap();
        assert_eq!(copied, "first");
        assert!(fs.file_exists(Utf8Path::new("a/orig.txt")));

        let err = fs
            .copy_file(Utf8Path::new("a/orig.txt"), Utf8Path::new("a/other.txt"), false)
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));

        fs.copy_file(Utf8Path::new("a/orig.txt"), Utf8Path::new("a/other.txt"), true)
            .unwrap();
        let replaced = std::fs::read_to_string(fs.root().join("a/other.txt")).unwrap();
        assert_eq!(replaced, "first");
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_dir, fs) = setup();
        let err = fs.delete_file(Utf8Path::new("ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_directory_is_idempotent() {
        let (_dir, fs) = setup();
        fs.create_directory(Utf8Path::new("a/b")).unwrap();
        fs.create_directory(Utf8Path::new("a/b")).unwrap();
        assert!(fs.directory_exists(Utf8Path::new("a/b")));
        assert!(fs.directory_exists(Utf8Path::new("")));
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let (_dir, fs) = setup();
        let err = fs.open_file(Utf8Path::new("../etc/passwd")).unwrap_err();
        assert!(matches!(err, FsError::InvalidPath { .. }));
    }
}
