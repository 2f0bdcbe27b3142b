//! # Directory
//!
//! A directory owns the [`File`] and [`Directory`] handles cached beneath it.
//!
//! ## Caching
//!
//! Children are materialized lazily: the first lookup of a name that exists on
//! disk builds a handle and caches it; later lookups return the same `Arc`.
//! Checking the cache and inserting into it happen under one exclusive lock
//! acquisition, so two threads racing on the same name always end up with
//! the same object.
//!
//! The cache is never invalidated when the disk changes underneath it. The
//! one exception is a kind conflict (a name cached as a file that is now a
//! directory on disk, or the reverse): the stale entry is replaced.
//!
//! ## Locking
//!
//! The lock guards only the child map. It is never held while calling into a
//! child or the parent, so walking down (`open_directory`) and up
//! (`get_parent`) cannot deadlock against each other.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use log::{debug, trace, warn};

use crate::path::validate_name;
use crate::{EntryKind, File, FsError};

enum Cached {
    File(Arc<File>),
    Directory(Arc<Directory>),
}

/// A directory inside a [`FileSystem`](crate::FileSystem).
///
/// Obtained from [`FileSystem::open_directory`](crate::FileSystem::open_directory)
/// or from another directory. All methods take `&self` and are safe to call
/// from many threads.
///
/// # Example
///
/// ```rust
/// use lockfs::FileSystem;
///
/// let tmp = tempfile::tempdir()?;
/// let fs = FileSystem::new(tmp.path())?;
/// let root = fs.get_root_directory();
///
/// let logs = root.open_directory("logs")?;
/// let today = logs.open_file("today.log")?;
/// assert!(std::sync::Arc::ptr_eq(&today, &logs.get_file("today.log")?));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Directory {
    path: PathBuf,
    /// `None` only for the root.
    parent: Option<Weak<Directory>>,
    this: Weak<Directory>,
    entries: RwLock<HashMap<String, Cached>>,
}

impl Directory {
    pub(crate) fn new_root(path: PathBuf) -> Arc<Self> {
        Self::new(path, None)
    }

    fn new(path: PathBuf, parent: Option<Weak<Directory>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            path,
            parent,
            this: this.clone(),
            entries: RwLock::new(HashMap::new()),
        })
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, Cached>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, Cached>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_found(&self, name: &str, expected: EntryKind) -> FsError {
        FsError::EntryNotFound {
            path: self.path.join(name),
            expected,
        }
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Get the file named `name`.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if no entry named `name` exists, or it is
    ///   a directory
    /// - [`FsError::InvalidName`] if `name` is not a single path component
    pub fn get_file(&self, name: &str) -> Result<Arc<File>, FsError> {
        validate_name(name)?;
        if !self.file_exists(name)? {
            return Err(self.not_found(name, EntryKind::File));
        }
        if let Some(Cached::File(file)) = self.read_entries().get(name) {
            trace!("cache hit for file {}", self.path.join(name).display());
            return Ok(Arc::clone(file));
        }
        self.cache_file(name)
    }

    /// Get the subdirectory named `name`.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if no entry named `name` exists, or it is
    ///   a file
    /// - [`FsError::InvalidName`] if `name` is not a single path component
    pub fn get_directory(&self, name: &str) -> Result<Arc<Directory>, FsError> {
        validate_name(name)?;
        if !self.directory_exists(name)? {
            return Err(self.not_found(name, EntryKind::Directory));
        }
        if let Some(Cached::Directory(dir)) = self.read_entries().get(name) {
            trace!("cache hit for directory {}", dir.path.display());
            return Ok(Arc::clone(dir));
        }
        self.cache_directory(name)
    }

    /// Get the file named `name`, creating an empty one if nothing by that
    /// name exists.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if `name` exists as a directory
    /// - [`FsError::Io`] if the file cannot be created
    pub fn open_file(&self, name: &str) -> Result<Arc<File>, FsError> {
        validate_name(name)?;
        if self.entry_kind(name)?.is_none() {
            self.create_file(name)?;
        }
        self.get_file(name)
    }

    /// Get the subdirectory named `name`, creating it if nothing by that name
    /// exists.
    ///
    /// # Errors
    ///
    /// - [`FsError::EntryNotFound`] if `name` exists as a file
    /// - [`FsError::Io`] if the directory cannot be created
    pub fn open_directory(&self, name: &str) -> Result<Arc<Directory>, FsError> {
        validate_name(name)?;
        if self.entry_kind(name)?.is_none() {
            self.create_directory(name)?;
        }
        self.get_directory(name)
    }

    /// The parent directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] on the root
    /// - [`FsError::Detached`] if the tree this directory belonged to is gone
    pub fn get_parent(&self) -> Result<Arc<Directory>, FsError> {
        let parent = self.parent.as_ref().ok_or_else(|| FsError::InvalidPath {
            path: self.path.clone(),
            reason: "the root directory has no parent",
        })?;
        parent.upgrade().ok_or_else(|| FsError::Detached {
            path: self.path.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Create an empty file named `name` if it does not exist yet.
    ///
    /// Existing content is left untouched.
    pub fn create_file(&self, name: &str) -> Result<(), FsError> {
        validate_name(name)?;
        let path = self.path.join(name);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| FsError::io("create_file", &path, e))?;
        debug!("created file {}", path.display());
        Ok(())
    }

    /// Create a subdirectory named `name` if it does not exist yet.
    pub fn create_directory(&self, name: &str) -> Result<(), FsError> {
        validate_name(name)?;
        let path = self.path.join(name);
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!("created directory {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(FsError::io("create_directory", &path, e)),
        }
    }

    // ------------------------------------------------------------------------
    // Existence
    // ------------------------------------------------------------------------

    /// What `name` currently is on disk, ignoring the cache.
    ///
    /// Symlinks are followed.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] if `name` is not a single path component
    pub fn entry_kind(&self, name: &str) -> Result<Option<EntryKind>, FsError> {
        validate_name(name)?;
        let path = self.path.join(name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(EntryKind::of(meta.file_type()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::io("metadata", &path, e)),
        }
    }

    /// Whether `name` is a file on disk.
    pub fn file_exists(&self, name: &str) -> Result<bool, FsError> {
        Ok(self.entry_kind(name)? == Some(EntryKind::File))
    }

    /// Whether `name` is a directory on disk.
    pub fn directory_exists(&self, name: &str) -> Result<bool, FsError> {
        Ok(self.entry_kind(name)? == Some(EntryKind::Directory))
    }

    /// Whether a handle for `name` has been cached.
    pub fn is_cached(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    /// Number of cached children.
    pub fn cached_count(&self) -> usize {
        self.read_entries().len()
    }

    // ------------------------------------------------------------------------
    // Cache population
    // ------------------------------------------------------------------------

    fn cache_file(&self, name: &str) -> Result<Arc<File>, FsError> {
        let path = self.path.join(name);
        let mut entries = self.write_entries();
        let file = match entries.entry(name.to_owned()) {
            Entry::Occupied(mut slot) => match slot.get() {
                Cached::File(file) => Arc::clone(file),
                Cached::Directory(_) => {
                    warn!("replacing stale directory entry {}", path.display());
                    let file = Arc::new(File::open(path.clone(), self.this.clone())?);
                    slot.insert(Cached::File(Arc::clone(&file)));
                    file
                }
            },
            Entry::Vacant(slot) => {
                let file = Arc::new(File::open(path.clone(), self.this.clone())?);
                slot.insert(Cached::File(Arc::clone(&file)));
                file
            }
        };
        drop(entries);
        debug!("cached file {}", path.display());
        Ok(file)
    }

    fn cache_directory(&self, name: &str) -> Result<Arc<Directory>, FsError> {
        let path = self.path.join(name);
        let mut entries = self.write_entries();
        let dir = match entries.entry(name.to_owned()) {
            Entry::Occupied(mut slot) => match slot.get() {
                Cached::Directory(dir) => Arc::clone(dir),
                Cached::File(_) => {
                    warn!("replacing stale file entry {}", path.display());
                    let dir = Directory::new(path.clone(), Some(self.this.clone()));
                    slot.insert(Cached::Directory(Arc::clone(&dir)));
                    dir
                }
            },
            Entry::Vacant(slot) => {
                let dir = Directory::new(path.clone(), Some(self.this.clone()));
                slot.insert(Cached::Directory(Arc::clone(&dir)));
                dir
            }
        };
        drop(entries);
        debug!("cached directory {}", path.display());
        Ok(dir)
    }

    /// Move `file`'s cache entry from `old` to `new` after a rename on disk.
    ///
    /// Whatever was cached under `new` described the entry the rename
    /// replaced, so it is dropped. Nothing happens if `old` no longer maps
    /// to `file`.
    pub(crate) fn rekey_file(&self, old: &str, new: &str, file: &File) {
        let mut entries = self.write_entries();
        let owned = matches!(
            entries.get(old),
            Some(Cached::File(cached)) if std::ptr::eq(Arc::as_ptr(cached), file)
        );
        if !owned {
            return;
        }
        if let Some(entry) = entries.remove(old) {
            entries.insert(new.to_owned(), entry);
        }
        drop(entries);
        debug!(
            "moved cache entry {} to {}",
            self.path.join(old).display(),
            self.path.join(new).display()
        );
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Directory name (last path component).
    pub fn get_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Absolute path of the directory.
    pub fn get_path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` for the root of a filesystem.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("path", &self.path)
            .field("root", &self.is_root())
            .field("cached", &self.cached_count())
            .finish()
    }
}
