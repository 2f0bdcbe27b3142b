//! Error types for the lockfs caching layer.

use std::path::PathBuf;

use crate::EntryKind;

/// Filesystem error type with contextual variants.
///
/// Every variant carries the path (and, where useful, the operation) that
/// produced it. Lookup failures are permanent for the call that produced them;
/// nothing in this crate retries.
///
/// # Examples
///
/// ```rust
/// use lockfs::{EntryKind, FsError};
/// use std::path::PathBuf;
///
/// let err = FsError::EntryNotFound {
///     path: PathBuf::from("data/config.toml"),
///     expected: EntryKind::File,
/// };
/// assert_eq!(err.to_string(), "file not found: data/config.toml");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Resolution Errors
    /// An absolute path was given where a relative one is required, or `..`
    /// was traversed past the root.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// A named entry does not exist, or exists as the wrong kind.
    #[error("{expected} not found: {path}")]
    EntryNotFound {
        /// The path that was looked up.
        path: PathBuf,
        /// The kind of entry the operation required.
        expected: EntryKind,
    },

    /// A name was not a single, normal path component.
    #[error("invalid entry name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A directory handle outlived the tree it belonged to.
    #[error("directory is detached from its tree: {path}")]
    Detached {
        /// The directory whose parent is gone.
        path: PathBuf,
    },

    // Data Errors
    /// File content could not be decoded.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The file holding the data.
        path: PathBuf,
        /// Details about the failure.
        details: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Backend Errors
    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Wraps an I/O error with the operation and path that produced it.
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        FsError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for lookups that failed because the entry is missing or
    /// of the wrong kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::EntryNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_display() {
        let err = FsError::InvalidPath {
            path: PathBuf::from("/etc/passwd"),
            reason: "path must be relative",
        };
        assert_eq!(
            err.to_string(),
            "invalid path: /etc/passwd (path must be relative)"
        );
    }

    #[test]
    fn entry_not_found_names_expected_kind() {
        let err = FsError::EntryNotFound {
            path: PathBuf::from("logs"),
            expected: EntryKind::Directory,
        };
        assert_eq!(err.to_string(), "directory not found: logs");
        assert!(err.is_not_found());
    }

    #[test]
    fn invalid_name_is_quoted() {
        let err = FsError::InvalidName { name: "a/b".into() };
        assert_eq!(err.to_string(), "invalid entry name: \"a/b\"");
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error;

        let err = FsError::io(
            "write",
            "out.txt",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.to_string(), "write failed for out.txt: disk full");
        assert!(err.source().is_some());
    }
}
