//! # File
//!
//! A lock-protected handle over one [`ByteStore`].
//!
//! ## Locking
//!
//! Each `File` owns a single reader/writer lock guarding its path, its store,
//! and its cursor.
//!
//! | Operation | Lock |
//! |-----------|------|
//! | [`read`](File::read), [`get_contents`](File::get_contents), [`get_size`](File::get_size) | shared |
//! | [`write`](File::write), [`append`](File::append), [`set_contents`](File::set_contents), [`clear`](File::clear), [`set_name`](File::set_name) | exclusive |
//! | Cursor access: `Read`/`Write`/`Seek` for `&File`, [`read_token`](File::read_token), [`rewind`](File::rewind) | exclusive |
//!
//! Explicit-offset reads never touch the cursor, so they run concurrently
//! with each other. Anything that moves the cursor is serialized, even when
//! it only reads.
//!
//! Lock acquisition blocks without a timeout.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use log::debug;

use crate::path::validate_name;
use crate::store::{ByteStore, NativeStore};
use crate::{Directory, FsError};

/// Bytes fetched per step while scanning for a token.
const TOKEN_CHUNK: usize = 64;

struct FileState {
    path: PathBuf,
    store: Box<dyn ByteStore>,
    cursor: u64,
}

impl FileState {
    fn io_error(&self, operation: &'static str) -> impl FnOnce(io::Error) -> FsError + '_ {
        move |source| FsError::io(operation, &self.path, source)
    }

    fn size(&self) -> Result<u64, FsError> {
        self.store.size().map_err(self.io_error("size"))
    }

    fn write_flushed(&mut self, data: &[u8], pos: u64) -> Result<(), FsError> {
        let result = self
            .store
            .write_at(pos, data)
            .and_then(|()| self.store.flush());
        result.map_err(self.io_error("write"))
    }
}

/// A file inside a [`FileSystem`](crate::FileSystem).
///
/// Files are created by their owning [`Directory`](crate::Directory) and
/// handed out as `Arc<File>`; at most one `File` exists per path within a
/// filesystem. All methods take `&self` and are safe to call from many
/// threads at once.
///
/// # Example
///
/// ```rust
/// use lockfs::{File, MemoryStore};
///
/// let file = File::with_store("notes.txt", MemoryStore::new());
/// file.set_contents("hello")?;
/// file.append(", world")?;
/// assert_eq!(file.get_contents()?, b"hello, world");
/// # Ok::<(), lockfs::FsError>(())
/// ```
pub struct File {
    /// The directory caching this file; `None` for standalone files.
    parent: Option<Weak<Directory>>,
    state: RwLock<FileState>,
}

impl File {
    /// Open the existing file at `path` on disk, cached by `parent`.
    pub(crate) fn open(path: PathBuf, parent: Weak<Directory>) -> Result<Self, FsError> {
        let store = NativeStore::open(&path).map_err(|e| FsError::io("open", &path, e))?;
        let mut file = Self::with_store(path, store);
        file.parent = Some(parent);
        Ok(file)
    }

    /// Wrap an arbitrary byte store.
    ///
    /// `path` is only used for naming and error context; the store itself
    /// decides what a rename means.
    pub fn with_store(path: impl Into<PathBuf>, store: impl ByteStore + 'static) -> Self {
        Self {
            parent: None,
            state: RwLock::new(FileState {
                path: path.into(),
                store: Box::new(store),
                cursor: 0,
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FileState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FileState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Read the entire contents of the file.
    ///
    /// The size query and the read happen under one lock acquisition, so a
    /// concurrent writer is observed either completely or not at all.
    pub fn get_contents(&self) -> Result<Vec<u8>, FsError> {
        let state = self.read_state();
        let size = state.size()?;
        let len = usize::try_from(size).unwrap_or(usize::MAX);
        state.store.read_at(0, len).map_err(state.io_error("read"))
    }

    /// Read the entire contents as UTF-8.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidData`] if the content is not valid UTF-8
    pub fn get_contents_string(&self) -> Result<String, FsError> {
        let bytes = self.get_contents()?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidData {
            path: self.get_path(),
            details: e.to_string(),
        })
    }

    /// Read up to `count` bytes starting at `pos`.
    ///
    /// Reads past the end of the file return a shorter (possibly empty)
    /// buffer. The cursor is not moved.
    pub fn read(&self, pos: u64, count: usize) -> Result<Vec<u8>, FsError> {
        let state = self.read_state();
        state.store.read_at(pos, count).map_err(state.io_error("read"))
    }

    /// Write `data` at `pos`, overwriting whatever is there.
    ///
    /// The write is flushed before returning. The cursor is not moved.
    pub fn write(&self, data: impl AsRef<[u8]>, pos: u64) -> Result<(), FsError> {
        self.write_state().write_flushed(data.as_ref(), pos)
    }

    /// Write `data` at the end of the file.
    ///
    /// The end is observed and written under one exclusive lock, so
    /// concurrent appends never overwrite each other.
    pub fn append(&self, data: impl AsRef<[u8]>) -> Result<(), FsError> {
        let mut state = self.write_state();
        let size = state.size()?;
        state.write_flushed(data.as_ref(), size)
    }

    /// Replace the entire contents of the file and rewind the cursor.
    pub fn set_contents(&self, data: impl AsRef<[u8]>) -> Result<(), FsError> {
        let mut state = self.write_state();
        state.store.truncate().map_err(state.io_error("truncate"))?;
        state.cursor = 0;
        state.write_flushed(data.as_ref(), 0)
    }

    /// Truncate the file to zero length and rewind the cursor.
    pub fn clear(&self) -> Result<(), FsError> {
        let mut state = self.write_state();
        state.store.truncate().map_err(state.io_error("truncate"))?;
        state.cursor = 0;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// Move the cursor back to the start of the file.
    pub fn rewind(&self) {
        self.write_state().cursor = 0;
    }

    /// Current cursor position.
    pub fn cursor(&self) -> u64 {
        self.read_state().cursor
    }

    /// Read the next whitespace-delimited token at the cursor.
    ///
    /// Leading ASCII whitespace is skipped; the cursor is left on the
    /// whitespace that ends the token. Returns `None` at end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidData`] if the token is not valid UTF-8
    pub fn read_token(&self) -> Result<Option<String>, FsError> {
        let mut guard = self.write_state();
        let state = &mut *guard;
        let mut token = Vec::new();
        let mut pos = state.cursor;
        'scan: loop {
            let chunk = state
                .store
                .read_at(pos, TOKEN_CHUNK)
                .map_err(|e| FsError::io("read", &state.path, e))?;
            if chunk.is_empty() {
                break;
            }
            for byte in chunk {
                if byte.is_ascii_whitespace() {
                    if !token.is_empty() {
                        break 'scan;
                    }
                } else {
                    token.push(byte);
                }
                pos += 1;
            }
        }
        state.cursor = pos;

        if token.is_empty() {
            return Ok(None);
        }
        String::from_utf8(token)
            .map(Some)
            .map_err(|e| FsError::InvalidData {
                path: state.path.clone(),
                details: e.to_string(),
            })
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Rename the file within its directory.
    ///
    /// Once the rename succeeds on disk, the owning directory's cache entry
    /// moves to the new name, so later lookups of `new_name` return this
    /// handle and the old name is free for a new file. The file lock is
    /// released before the directory lock is taken.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] if `new_name` is not a single path component
    /// - [`FsError::Io`] if the rename fails on disk
    pub fn set_name(&self, new_name: &str) -> Result<(), FsError> {
        validate_name(new_name)?;
        let mut state = self.write_state();
        let new_path = state.path.with_file_name(new_name);
        state
            .store
            .rename(&new_path)
            .map_err(state.io_error("rename"))?;
        debug!(
            "renamed {} to {}",
            state.path.display(),
            new_path.display()
        );
        let old_path = std::mem::replace(&mut state.path, new_path);
        drop(state);

        let old_name = old_path.file_name().and_then(|name| name.to_str());
        let parent = self.parent.as_ref().and_then(Weak::upgrade);
        if let (Some(old_name), Some(parent)) = (old_name, parent) {
            parent.rekey_file(old_name, new_name, self);
        }
        Ok(())
    }

    /// File name, including its extension.
    pub fn get_name(&self) -> String {
        let state = self.read_state();
        state
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension without the leading dot, if any.
    pub fn get_extension(&self) -> Option<String> {
        let state = self.read_state();
        state
            .path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// File name without its final extension.
    pub fn get_stem(&self) -> String {
        let state = self.read_state();
        state
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Absolute path of the file.
    pub fn get_path(&self) -> PathBuf {
        self.read_state().path.clone()
    }

    /// Current size in bytes.
    pub fn get_size(&self) -> Result<u64, FsError> {
        self.read_state().size()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("File")
            .field("path", &state.path)
            .field("cursor", &state.cursor)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Stream access
// ============================================================================

impl Read for &File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.write_state();
        let chunk = state.store.read_at(state.cursor, buf.len())?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        state.cursor += chunk.len() as u64;
        Ok(chunk.len())
    }
}

impl Write for &File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.write_state();
        let cursor = state.cursor;
        state.store.write_at(cursor, buf)?;
        state.cursor += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_state().store.flush()
    }
}

impl Seek for &File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut state = self.write_state();
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => state.store.size()?.checked_add_signed(delta),
            SeekFrom::Current(delta) => state.cursor.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        state.cursor = target;
        Ok(target)
    }
}

/// Path of `file` relative to `root`, if it lies beneath it.
pub(crate) fn relative_to(file: &File, root: &Path) -> Option<PathBuf> {
    file.get_path()
        .strip_prefix(root)
        .ok()
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::Arc;
    use std::thread;

    fn memory_file(name: &str) -> File {
        File::with_store(name, MemoryStore::new())
    }

    #[test]
    fn file_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<File>();
    }

    #[test]
    fn set_contents_round_trip() {
        let file = memory_file("test2.txt");
        file.set_contents("These are the contents of the second file!")
            .unwrap();
        assert_eq!(
            file.get_contents_string().unwrap(),
            "These are the contents of the second file!"
        );
        file.set_contents("").unwrap();
        assert!(file.get_contents().unwrap().is_empty());
        assert_eq!(file.get_size().unwrap(), 0);
    }

    #[test]
    fn read_is_clamped_to_end() {
        let file = File::with_store("a.txt", MemoryStore::from_bytes("hello"));
        assert_eq!(file.read(1, 3).unwrap(), b"ell");
        assert_eq!(file.read(3, 100).unwrap(), b"lo");
        assert!(file.read(10, 1).unwrap().is_empty());
    }

    #[test]
    fn write_overwrites_range() {
        let file = File::with_store("a.txt", MemoryStore::from_bytes("hello world"));
        file.write("WORLD", 6).unwrap();
        assert_eq!(file.get_contents().unwrap(), b"hello WORLD");
    }

    #[test]
    fn sequential_appends_concatenate() {
        let file = memory_file("log.txt");
        file.append("a").unwrap();
        file.append("b").unwrap();
        assert_eq!(file.get_contents().unwrap(), b"ab");
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let file = Arc::new(memory_file("log.txt"));
        let first = "first message ".repeat(64);
        let second = "second message ".repeat(64);

        thread::scope(|s| {
            s.spawn(|| file.append(&first).unwrap());
            s.spawn(|| file.append(&second).unwrap());
        });

        let contents = file.get_contents_string().unwrap();
        assert_eq!(contents.len(), first.len() + second.len());
        assert!(contents.contains(&first));
        assert!(contents.contains(&second));
    }

    #[test]
    fn write_at_huge_offset_is_an_error() {
        let file = File::with_store("m", MemoryStore::from_bytes("keep"));
        assert!(matches!(
            file.write("x", u64::MAX),
            Err(FsError::Io { operation: "write", .. })
        ));
        assert!(file.append("!").is_ok());
        assert_eq!(file.get_contents().unwrap(), b"keep!");
    }

    #[test]
    fn names_are_derived_from_path() {
        let file = memory_file("dir/test3.txt");
        assert_eq!(file.get_name(), "test3.txt");
        assert_eq!(file.get_extension().as_deref(), Some("txt"));
        assert_eq!(file.get_stem(), "test3");
        assert_eq!(file.get_size().unwrap(), 0);

        let bare = memory_file("Makefile");
        assert_eq!(bare.get_extension(), None);
        assert_eq!(bare.get_stem(), "Makefile");
    }

    #[test]
    fn set_name_updates_path() {
        let file = memory_file("dir/old.txt");
        file.set_name("new.md").unwrap();
        assert_eq!(file.get_path(), PathBuf::from("dir/new.md"));
        assert_eq!(file.get_extension().as_deref(), Some("md"));
    }

    #[test]
    fn set_name_rejects_paths() {
        let file = memory_file("dir/old.txt");
        let err = file.set_name("../escape.txt").unwrap_err();
        assert!(matches!(err, FsError::InvalidName { .. }));
        assert_eq!(file.get_path(), PathBuf::from("dir/old.txt"));
    }

    #[test]
    fn stream_write_advances_cursor() {
        let file = memory_file("words.txt");
        for word in ["These ", "are ", "some ", "words!"] {
            write!(&file, "{word}").unwrap();
        }
        assert_eq!(file.get_contents_string().unwrap(), "These are some words!");
        assert_eq!(file.cursor(), 21);

        file.set_contents("").unwrap();
        assert_eq!(file.cursor(), 0);
    }

    #[test]
    fn read_token_splits_on_whitespace() {
        let file = File::with_store(
            "test1.txt",
            MemoryStore::from_bytes("These are the contents\n of the  first test file!"),
        );
        let mut joined = String::new();
        while let Some(token) = file.read_token().unwrap() {
            joined.push_str(&token);
        }
        assert_eq!(joined, "Thesearethecontentsofthefirsttestfile!");
        assert_eq!(file.read_token().unwrap(), None);

        file.rewind();
        assert_eq!(file.read_token().unwrap().as_deref(), Some("These"));
    }

    #[test]
    fn read_token_spans_chunks() {
        let long = "x".repeat(TOKEN_CHUNK * 2 + 5);
        let file = File::with_store("long.txt", MemoryStore::from_bytes(format!("  {long} tail")));
        assert_eq!(file.read_token().unwrap(), Some(long));
        assert_eq!(file.read_token().unwrap().as_deref(), Some("tail"));
    }

    #[test]
    fn stream_read_and_seek() {
        let file = File::with_store("a.txt", MemoryStore::from_bytes("0123456789"));
        let mut handle = &file;
        handle.seek(SeekFrom::End(-3)).unwrap();
        let mut rest = String::new();
        handle.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "789");

        assert!(handle.seek(SeekFrom::Current(-20)).is_err());
        assert_eq!(handle.seek(SeekFrom::Start(2)).unwrap(), 2);
    }

    #[test]
    fn positional_io_leaves_cursor_alone() {
        let file = File::with_store("a.txt", MemoryStore::from_bytes("abcdef"));
        (&file).seek(SeekFrom::Start(4)).unwrap();
        file.read(0, 2).unwrap();
        file.write("XY", 0).unwrap();
        assert_eq!(file.cursor(), 4);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let file = File::with_store("bin.dat", MemoryStore::from_bytes(vec![0xff, 0xfe]));
        let err = file.get_contents_string().unwrap_err();
        assert!(matches!(err, FsError::InvalidData { .. }));
    }
}
