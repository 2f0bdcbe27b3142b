//! # FileSystem
//!
//! Entry point of the caching layer: owns the root [`Directory`] and resolves
//! relative paths against it.
//!
//! ## Resolution
//!
//! A path is split into segments and walked from the root one directory at a
//! time:
//!
//! | Segment | Step |
//! |---------|------|
//! | `name` | [`Directory::open_directory`] (created if missing) |
//! | `.` / empty | stay |
//! | `..` | [`Directory::get_parent`]; fails at the root |
//!
//! The final segment is opened as a file or a directory depending on the
//! call. Only one directory lock is held at any time during a walk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::file::relative_to;
use crate::path::{Segment, segments};
use crate::{Directory, EntryKind, File, FsConfig, FsError};

/// A cached, thread-safe view of one directory subtree.
///
/// Every path is interpreted relative to the root. Resolving the same path
/// twice, from any thread, yields the same `Arc`.
///
/// # Example
///
/// ```rust
/// use lockfs::FileSystem;
///
/// let tmp = tempfile::tempdir()?;
/// let fs = FileSystem::new(tmp.path())?;
///
/// fs.open_file("a/b/c.txt")?.set_contents("hello")?;
/// assert_eq!(fs.open_file("a/./b/c.txt")?.get_contents()?, b"hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct FileSystem {
    root: Arc<Directory>,
}

impl FileSystem {
    /// Bind a filesystem to an existing root directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if `root` is missing or not a directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FsError> {
        Self::with_config(FsConfig::new(root))
    }

    /// Bind a filesystem according to `config`.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if the root is missing (and not created)
    ///   or is not a directory
    /// - [`FsError::Io`] if the root cannot be created or inspected
    pub fn with_config(config: FsConfig) -> Result<Self, FsError> {
        let root = config.root();
        if config.creates_root() {
            fs::create_dir_all(root).map_err(|e| FsError::io("create_root", root, e))?;
        }
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(missing_root(root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing_root(root)),
            Err(e) => return Err(FsError::io("metadata", root, e)),
        }
        debug!("filesystem rooted at {}", root.display());
        Ok(Self {
            root: Directory::new_root(root.to_path_buf()),
        })
    }

    /// Open the file at `path`, creating it and any missing parent
    /// directories.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is absolute, does not end in a
    ///   file name, or climbs above the root with `..`
    /// - [`FsError::EntryNotFound`] if an intermediate segment is a file, or
    ///   the final segment is a directory
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<Arc<File>, FsError> {
        let path = path.as_ref();
        let segs = segments(path)?;
        let Some((Segment::Name(name), parents)) = segs.split_last() else {
            return Err(FsError::InvalidPath {
                path: path.to_path_buf(),
                reason: "path does not end in a file name",
            });
        };
        self.walk(path, parents)?.open_file(name)
    }

    /// Open the directory at `path`, creating it and any missing parents.
    ///
    /// The empty path opens the root.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is absolute or climbs above the root
    /// - [`FsError::EntryNotFound`] if any segment is a file
    pub fn open_directory(&self, path: impl AsRef<Path>) -> Result<Arc<Directory>, FsError> {
        let path = path.as_ref();
        let segs = segments(path)?;
        self.walk(path, &segs)
    }

    /// The root directory.
    pub fn get_root_directory(&self) -> Arc<Directory> {
        Arc::clone(&self.root)
    }

    /// The path this filesystem is bound to.
    pub fn root_path(&self) -> &Path {
        self.root.get_path()
    }

    /// Path of `file` relative to the root, or `None` if it lies elsewhere.
    pub fn relative_path(&self, file: &File) -> Option<PathBuf> {
        relative_to(file, self.root_path())
    }

    fn walk(&self, path: &Path, segs: &[Segment<'_>]) -> Result<Arc<Directory>, FsError> {
        let mut current = Arc::clone(&self.root);
        for segment in segs {
            current = match *segment {
                Segment::Current => continue,
                Segment::Parent => current.get_parent().map_err(|e| match e {
                    FsError::InvalidPath { .. } => FsError::InvalidPath {
                        path: path.to_path_buf(),
                        reason: "path climbs above the filesystem root",
                    },
                    other => other,
                })?,
                Segment::Name(name) => current.open_directory(name)?,
            };
        }
        Ok(current)
    }
}

fn missing_root(root: &Path) -> FsError {
    FsError::EntryNotFound {
        path: root.to_path_buf(),
        expected: EntryKind::Directory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, FileSystem) {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FileSystem::new(tmp.path()).unwrap();
        (tmp, fs)
    }

    #[test]
    fn filesystem_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileSystem>();
    }

    #[test]
    fn open_file_creates_parents() {
        let (tmp, fs) = fixture();
        let file = fs.open_file("a/b/c.txt").unwrap();
        assert!(tmp.path().join("a/b").is_dir());
        assert!(tmp.path().join("a/b/c.txt").is_file());
        assert_eq!(file.get_size().unwrap(), 0);
        assert_eq!(fs.relative_path(&file), Some(PathBuf::from("a/b/c.txt")));
    }

    #[test]
    fn dot_segments_resolve_to_same_handle() {
        let (_tmp, fs) = fixture();
        let direct = fs.open_file("a/b/c.txt").unwrap();
        let dotted = fs.open_file("./a//b/../b/./c.txt").unwrap();
        assert!(Arc::ptr_eq(&direct, &dotted));
    }

    #[test]
    fn open_directory_trailing_dots() {
        let (_tmp, fs) = fixture();
        let b = fs.open_directory("a/b").unwrap();
        assert!(Arc::ptr_eq(&b, &fs.open_directory("a/b/.").unwrap()));
        let a = fs.open_directory("a/b/..").unwrap();
        assert!(Arc::ptr_eq(&a, &b.get_parent().unwrap()));
        assert!(fs.open_directory("").unwrap().is_root());
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_are_rejected() {
        let (_tmp, fs) = fixture();
        assert!(matches!(
            fs.open_file("/tmp/x.txt"),
            Err(FsError::InvalidPath { .. })
        ));
        assert!(matches!(
            fs.open_directory("/tmp"),
            Err(FsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn climbing_above_root_is_rejected() {
        let (_tmp, fs) = fixture();
        let err = fs.open_file("../escape.txt").unwrap_err();
        assert!(matches!(err, FsError::InvalidPath { ref path, .. } if path == Path::new("../escape.txt")));
        assert!(fs.open_directory("a/../..").is_err());
        // Entering and leaving a child is fine.
        assert!(fs.open_file("a/../ok.txt").is_ok());
    }

    #[test]
    fn open_file_needs_a_name() {
        let (_tmp, fs) = fixture();
        for path in ["", ".", "a/.."] {
            assert!(matches!(
                fs.open_file(path),
                Err(FsError::InvalidPath { .. })
            ));
        }
    }

    #[test]
    fn file_in_the_middle_is_not_found() {
        let (_tmp, fs) = fixture();
        fs.open_file("plain.txt").unwrap();
        let err = fs.open_file("plain.txt/inner.txt").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_root_is_rejected_unless_created() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested/root");
        assert!(FileSystem::new(&root).unwrap_err().is_not_found());

        let fs = FileSystem::with_config(FsConfig::new(&root).create_root(true)).unwrap();
        assert_eq!(fs.root_path(), root.as_path());
        assert!(root.is_dir());
    }

    #[test]
    fn root_must_be_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        std::fs::write(&file, b"").unwrap();
        assert!(FileSystem::new(&file).unwrap_err().is_not_found());
    }
}
