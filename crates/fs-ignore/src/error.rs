//! Error types for the fs-ignore crate.

use camino::Utf8PathBuf;
use fs_core::FsError;

/// Errors that can occur while building a [`PathFilter`](crate::PathFilter).
///
/// # Error Recovery Strategy
///
/// Both variants are fatal for filter construction: a filter that silently
/// dropped a rule could mirror files the user asked to keep out.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// A rule could not be compiled into a matcher.
    #[error("invalid ignore rule '{line}': {source}")]
    Compile {
        /// The rule text as written.
        line: String,
        /// The underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// An ignore file could not be read.
    #[error("failed to read ignore file {path}: {source}")]
    Read {
        /// The ignore file, relative to the tree root.
        path: Utf8PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: FsError,
    },
}

impl PatternError {
    /// Creates a new [`PatternError::Compile`] error.
    #[inline]
    pub fn compile(line: impl Into<String>, source: regex::Error) -> Self {
        Self::Compile {
            line: line.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new [`PatternError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: FsError) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Returns the offending rule text, if this is a compile error.
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Compile { line, .. } => Some(line),
            Self::Read { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_carries_line() {
        let source = regex::Regex::new("[z-a]").unwrap_err();
        let error = PatternError::compile("[z-a]", source);
        assert_eq!(error.line(), Some("[z-a]"));
        assert!(error.to_string().starts_with("invalid ignore rule '[z-a]'"));
    }

    #[test]
    fn test_read_error_display() {
        let error = PatternError::read(
            "sub/.fsignore",
            FsError::NotFound(Utf8PathBuf::from("sub/.fsignore")),
        );
        assert!(error.to_string().contains("sub/.fsignore"));
        assert!(error.line().is_none());
    }
}
