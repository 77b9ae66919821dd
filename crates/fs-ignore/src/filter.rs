//! Path inclusion decisions over an ordered rule set.
//!
//! This module provides [`PathFilter`], which answers "should this path be
//! left out of the mirror?" for relative paths. Directory verdicts are cached
//! in a [`DashMap`] so that siblings under the same parent are decided once.
//!
//! # Precedence
//!
//! Every rule is checked. The index of the last matching inclusive rule and
//! the index of the last matching exclusive rule are tracked; a path is
//! included when the inclusive index is the larger one. With no matches at
//! all, the path is included.

use camino::Utf8Path;
use dashmap::DashMap;
use fs_core::FileSystem;
use fs_core::path::split_parent;
use rustc_hash::FxBuildHasher;

use crate::error::PatternError;
use crate::pattern::{Pattern, PatternCompiler, PatternSet};

/// Name of the per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".fsignore";

/// Decides which relative paths are excluded from the mirror.
///
/// `PathFilter` is `Send + Sync`; the differ shares one instance across its
/// rayon workers.
///
/// # Examples
///
/// ```
/// use fs_ignore::PathFilter;
///
/// let filter = PathFilter::from_lines(["*.o", "!keep.o", "build/"])?;
/// assert!(filter.filtered("src/main.o"));
/// assert!(!filter.filtered("src/keep.o"));
/// assert!(filter.filtered("build/out.txt"));
/// assert!(!filter.filtered("src/main.c"));
/// # Ok::<(), fs_ignore::PatternError>(())
/// ```
#[derive(Debug, Default)]
pub struct PathFilter {
    patterns: PatternSet,
    /// Directory path (no trailing separator) to inclusion verdict.
    dir_cache: DashMap<String, bool, FxBuildHasher>,
}

impl PathFilter {
    /// Creates a filter over `patterns`.
    #[must_use]
    pub fn new(patterns: PatternSet) -> Self {
        Self {
            patterns,
            dir_cache: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Compiles `lines` relative to the root and builds a filter.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] encountered.
    pub fn from_lines<I>(lines: I) -> Result<Self, PatternError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        PatternSet::from_lines(lines).map(Self::new)
    }

    /// Builds a filter from every [`IGNORE_FILE_NAME`] file under the root of
    /// `fs`.
    ///
    /// Each file's rules are anchored to the directory that holds it. Files
    /// are read in sorted path order, so rules from deeper files come after
    /// (and override) rules from their ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Read`] if an ignore file cannot be listed or
    /// read, and [`PatternError::Compile`] for the first invalid rule.
    pub fn from_tree(fs: &dyn FileSystem) -> Result<Self, PatternError> {
        let mut patterns = PatternSet::new();
        load_ignore_files(fs, &mut patterns)?;
        Ok(Self::new(patterns))
    }

    /// Replaces the rule set and clears cached directory verdicts.
    pub fn set_patterns(&mut self, patterns: PatternSet) {
        self.patterns = patterns;
        self.dir_cache.clear();
    }

    /// Returns `true` if `path` must be left out.
    ///
    /// An entry is left out if its own path is excluded, or if the whole
    /// parent path (everything before the final segment, as one string) is
    /// excluded.
    #[must_use]
    pub fn filtered(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        match split_parent(path) {
            (None, _) => !self.is_included(path),
            (Some(parent), _) => !self.is_directory_included(parent) || !self.is_included(path),
        }
    }

    /// [`filtered`](Self::filtered) for a [`Utf8Path`].
    #[inline]
    #[must_use]
    pub fn filtered_path(&self, path: &Utf8Path) -> bool {
        self.filtered(path.as_str())
    }

    /// Returns `true` if `candidate` is included by the rules.
    ///
    /// A candidate with a trailing `/` is treated as a directory and its
    /// verdict is cached.
    #[must_use]
    pub fn is_included(&self, candidate: &str) -> bool {
        match candidate.strip_suffix('/') {
            Some(dir) => self.is_directory_included(dir),
            None => self.evaluate(candidate),
        }
    }

    /// Returns the rule that decides the verdict for `path`, if any matched.
    ///
    /// When the parent directory is excluded, the deciding rule is the last
    /// rule matching the parent.
    #[must_use]
    pub fn deciding_pattern(&self, path: &str) -> Option<&Pattern> {
        if let (Some(parent), _) = split_parent(path) {
            if !self.is_directory_included(parent) {
                return self.last_match(parent);
            }
        }
        self.last_match(path)
    }

    /// Number of compiled rules.
    #[inline]
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// The compiled rules, in precedence order.
    #[inline]
    #[must_use]
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Number of directories with a cached verdict.
    #[inline]
    #[must_use]
    pub fn cached_directories(&self) -> usize {
        self.dir_cache.len()
    }

    fn is_directory_included(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        if let Some(verdict) = self.dir_cache.get(dir) {
            return *verdict;
        }
        let verdict = self.evaluate(dir);
        // Racing workers compute the same value; the first insert is kept.
        *self.dir_cache.entry(dir.to_owned()).or_insert(verdict)
    }

    fn evaluate(&self, candidate: &str) -> bool {
        let mut last_included: isize = -1;
        let mut last_excluded: isize = -2;
        for (index, pattern) in (0_isize..).zip(self.patterns.iter()) {
            if !pattern.is_match(candidate) {
                continue;
            }
            if pattern.is_inclusive() {
                last_included = index;
            } else {
                last_excluded = index;
            }
        }
        last_included > last_excluded
    }

    fn last_match(&self, candidate: &str) -> Option<&Pattern> {
        self.patterns.iter().rev().find(|p| p.is_match(candidate))
    }
}

/// Discovers every ignore file under the root of `fs` and appends its rules.
fn load_ignore_files(fs: &dyn FileSystem, patterns: &mut PatternSet) -> Result<(), PatternError> {
    let files = fs
        .enumerate_files(Utf8Path::new(""), IGNORE_FILE_NAME)
        .map_err(|err| PatternError::read(IGNORE_FILE_NAME, err))?;

    for file in files {
        let text = read_to_string(fs, &file)?;
        let scope = file.parent().map_or("", Utf8Path::as_str);
        let compiler = PatternCompiler::scoped(scope);
        let before = patterns.len();
        patterns.extend_lines(&compiler, text.lines())?;
        tracing::debug!(
            file = %file,
            rules = patterns.len() - before,
            "loaded ignore file"
        );
    }
    Ok(())
}

fn read_to_string(fs: &dyn FileSystem, file: &Utf8Path) -> Result<String, PatternError> {
    use std::io::Read;

    let mut text = String::new();
    fs.open_file(file)
        .and_then(|mut handle| {
            handle
                .read_to_string(&mut text)
                .map_err(|err| fs_core::FsError::from_io(file, err))
        })
        .map_err(|err| PatternError::read(file, err))?;
    Ok(text)
}

/// Builds a filter from every ignore file discovered under `fs` (when given),
/// followed by `extra` root-relative rules.
///
/// # Errors
///
/// Returns the first [`PatternError`] encountered.
pub fn build_filter<I>(fs: Option<&dyn FileSystem>, extra: I) -> Result<PathFilter, PatternError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut patterns = PatternSet::new();
    if let Some(fs) = fs {
        load_ignore_files(fs, &mut patterns)?;
    }
    patterns.extend_lines(&PatternCompiler::new(), extra)?;
    tracing::info!(rules = patterns.len(), "built path filter");
    Ok(PathFilter::new(patterns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use fs_core::LocalFileSystem;
    use tempfile::TempDir;

    /// Rules from the gitignore conformance sample.
    const SAMPLE_RULES: &[&str] = &[
        "*.[oa]",
        "*.html",
        "*.min.js",
        "!foo*.html",
        "foo-excl.html",
        "vmlinux*",
        r"\!important!.txt",
        "log/*.log",
        "!/log/foo.log",
        "**/logdir/log",
        "**/foodir/bar",
        "exclude/**",
        "!findthis*",
        "**/hide/**",
        "subdir/subdir2/",
        "/rootsubdir/",
        "dirpattern/",
        "README.md",
        "!/arch/foo/kernel/vmlinux*",
        "/git-sample-3/*",
        "!/git-sample-3/foo",
        "/git-sample-3/foo/*",
        "!/git-sample-3/foo/bar",
        "!/htmldoc/*.html",
    ];

    /// `(path, included)` pairs for [`SAMPLE_RULES`].
    const SAMPLE_RESULTS: &[(&str, bool)] = &[
        ("!important!.txt", false),
        ("Documentation/foo-excl.html", false),
        ("Documentation/foo.html", true),
        ("Documentation/gitignore.html", false),
        ("Documentation/test.a.html", false),
        ("arch/foo/kernel/vmlinux.lds.S", true),
        ("arch/foo/vmlinux.lds.S", false),
        ("bar/testfile", true),
        ("dirpattern", true),
        ("exclude/dir1/dir2/dir3/testfile", false),
        ("file.o", false),
        ("foodir/bar/testfile", false),
        ("git-sample-3/foo/bar", true),
        ("git-sample-3/foo/test", false),
        ("git-sample-3/test", false),
        ("htmldoc/docs.html", true),
        ("htmldoc/jslib.min.js", false),
        ("lib.a", false),
        ("log/foo.log", true),
        ("log/test.log", false),
        ("rootsubdir/foo", false),
        ("src/findthis.o", true),
        ("src/internal.o", false),
        ("subdir/hide/foo", false),
        ("subdir/logdir/log/findthis.log", false),
        ("subdir/logdir/log/foo.log", false),
        ("subdir/logdir/log/test.log", false),
        ("subdir/rootsubdir/foo", true),
        ("subdir/subdir2/bar", false),
    ];

    #[test]
    fn test_gitignore_sample() {
        let filter = PathFilter::from_lines(SAMPLE_RULES).unwrap();
        assert_eq!(filter.pattern_count(), SAMPLE_RULES.len());
        for &(path, included) in SAMPLE_RESULTS {
            assert_eq!(!filter.filtered(path), included, "{path}");
        }
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filter = PathFilter::default();
        assert!(!filter.filtered("anything/at/all"));
        assert!(!filter.filtered(".git"));
        assert_eq!(filter.cached_directories(), 0);
    }

    #[test]
    fn test_later_rule_wins() {
        let filter = PathFilter::from_lines(["!a.txt", "*.txt"]).unwrap();
        assert!(filter.filtered("a.txt"));

        let filter = PathFilter::from_lines(["*.txt", "!a.txt"]).unwrap();
        assert!(!filter.filtered("a.txt"));
    }

    #[test]
    fn test_excluded_parent_excludes_children() {
        let filter = PathFilter::from_lines(["/build/**", "!*.keep"]).unwrap();
        assert!(filter.filtered("build/out/x.keep"));
        assert!(!filter.filtered("src/x.keep"));
    }

    #[test]
    fn test_directory_verdicts_are_cached() {
        let filter = PathFilter::from_lines(["tmp/"]).unwrap();
        assert!(filter.filtered("a/tmp/x"));
        assert!(filter.filtered("a/tmp/y"));
        assert!(!filter.filtered("a/b/z"));
        // "a/tmp" and "a/b"
        assert_eq!(filter.cached_directories(), 2);
        // The directory itself is not matched by a directory-only rule.
        assert!(filter.is_included("a/tmp/"));
    }

    #[test]
    fn test_set_patterns_clears_cache() {
        let mut filter = PathFilter::from_lines(["cache/"]).unwrap();
        assert!(filter.filtered("cache/a"));
        assert!(filter.cached_directories() > 0);

        filter.set_patterns(PatternSet::from_lines(["*.log"]).unwrap());
        assert_eq!(filter.cached_directories(), 0);
        assert!(!filter.filtered("cache/a"));
        assert!(filter.filtered("cache/a.log"));
    }

    #[test]
    fn test_deciding_pattern() {
        let filter = PathFilter::from_lines(["*.o", "!keep.o", "vendor/"]).unwrap();
        assert_eq!(
            filter.deciding_pattern("src/keep.o").map(Pattern::source),
            Some("!keep.o")
        );
        assert_eq!(
            filter.deciding_pattern("vendor/lib/a.c").map(Pattern::source),
            Some("vendor/")
        );
        assert!(filter.deciding_pattern("src/main.c").is_none());
    }

    #[test]
    fn test_from_tree_scopes_nested_files() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join(IGNORE_FILE_NAME), "*.log\n# comment\n").unwrap();
        std::fs::write(root.join("sub").join(IGNORE_FILE_NAME), "*.tmp\n!keep.log\n").unwrap();

        let fs = LocalFileSystem::new(root);
        let filter = PathFilter::from_tree(&fs).unwrap();
        assert_eq!(filter.pattern_count(), 3);

        assert!(filter.filtered("a.log"));
        assert!(filter.filtered("sub/x.tmp"));
        assert!(!filter.filtered("x.tmp"));
        assert!(!filter.filtered("sub/keep.log"));
        assert!(filter.filtered("other/keep.log"));
    }

    #[test]
    fn test_from_tree_nested_star_excludes_whole_directory() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("sub").join(IGNORE_FILE_NAME), "*\n").unwrap();

        let filter = PathFilter::from_tree(&LocalFileSystem::new(root)).unwrap();
        assert_eq!(filter.pattern_count(), 1);

        assert!(filter.filtered("sub/x.txt"));
        assert!(filter.filtered("sub/deep/y.txt"));
        assert!(!filter.filtered("x.txt"));
        assert!(!filter.filtered("other/x.txt"));
    }

    #[test]
    fn test_build_filter_appends_extra_rules() {
        let filter = build_filter(None, ["*.bak", "!important.bak"]).unwrap();
        assert!(filter.filtered("x.bak"));
        assert!(!filter.filtered("important.bak"));
    }

    #[test]
    fn test_from_tree_reports_bad_rule() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(root.join(IGNORE_FILE_NAME), "[z-a]\n").unwrap();

        let err = PathFilter::from_tree(&LocalFileSystem::new(root)).unwrap_err();
        assert_eq!(err.line(), Some("[z-a]"));
    }
}
