//! Core types shared across the caching layer.

use std::fmt;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }

    pub(crate) fn of(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_predicates() {
        assert!(EntryKind::File.is_file());
        assert!(!EntryKind::File.is_dir());
        assert!(EntryKind::Directory.is_dir());
    }

    #[test]
    fn entry_kind_display() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn entry_kind_serde() {
        let json = serde_json::to_string(&EntryKind::Directory).unwrap();
        let back: EntryKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EntryKind::Directory);
    }
}
