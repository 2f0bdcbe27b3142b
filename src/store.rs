//! # Byte Stores
//!
//! The byte-addressable capability a [`File`](crate::File) wraps.
//!
//! ## Overview
//!
//! A [`ByteStore`] is a single seekable, truncatable byte sequence. Reads are
//! positional and take `&self`, so a `File` can serve several readers at once
//! under its shared lock. Everything that mutates the store takes `&mut self`
//! and is only reachable through the `File`'s exclusive lock.
//!
//! | Store | Backing |
//! |-------|---------|
//! | [`NativeStore`] | An open `std::fs::File` (read + write) |
//! | [`MemoryStore`] | A `Vec<u8>`, for tests and scratch data |

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A seekable, truncatable byte sequence.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. [`read_at`](Self::read_at) and
/// [`size`](Self::size) must not depend on or disturb any shared position, so
/// they can run concurrently with each other.
pub trait ByteStore: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes when the store ends first, and an empty buffer when
    /// `offset` is at or past the end.
    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>>;

    /// Write all of `data` at `offset`, extending the store if needed.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Truncate to zero length.
    fn truncate(&mut self) -> io::Result<()>;

    /// Current length in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Push buffered writes down to the backing storage.
    fn flush(&mut self) -> io::Result<()>;

    /// Move the backing storage to `to`.
    fn rename(&mut self, to: &Path) -> io::Result<()>;
}

/// Number of bytes between `offset` and the end of a store of `size` bytes,
/// capped at `len`.
fn clamp_len(size: u64, offset: u64, len: usize) -> usize {
    let available = size.saturating_sub(offset);
    usize::try_from(available).map_or(len, |available| available.min(len))
}

/// Offset one past the last byte of a `len`-byte write at `offset`.
fn write_end(offset: u64, len: usize) -> io::Result<u64> {
    u64::try_from(len)
        .ok()
        .and_then(|len| offset.checked_add(len))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "write extends past u64::MAX"))
}

// ============================================================================
// NativeStore
// ============================================================================

/// Byte store backed by a file on disk, opened for reading and writing.
#[derive(Debug)]
pub struct NativeStore {
    path: PathBuf,
    file: std::fs::File,
}

impl NativeStore {
    /// Open an existing file for reading and writing.
    ///
    /// The file is neither created nor truncated.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn read_once(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(&self.file, buf, offset)
    }

    #[cfg(windows)]
    fn read_once(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(&self.file, buf, offset)
    }

    #[cfg(unix)]
    fn write_once(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(&self.file, data, offset)
    }

    #[cfg(windows)]
    fn write_once(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_write(&self.file, data, offset)
    }
}

impl ByteStore for NativeStore {
    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let len = clamp_len(self.size()?, offset, len);
        let mut buf = vec![0; len];
        let mut filled = 0;
        while filled < len {
            match self.read_once(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        // The file may have shrunk between the size query and the read.
        buf.truncate(filled);
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        write_end(offset, data.len())?;
        let mut written = 0;
        while written < data.len() {
            match self.write_once(&data[written..], offset + written as u64) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.file.set_len(0)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn rename(&mut self, to: &Path) -> io::Result<()> {
        std::fs::rename(&self.path, to)?;
        self.path = to.to_path_buf();
        Ok(())
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Byte store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Vec<u8>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `data`.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// The stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ByteStore for MemoryStore {
    fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let len = clamp_len(self.data.len() as u64, offset, len);
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = offset as usize;
        Ok(self.data[start..start + len].to_vec())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let out_of_range =
            || io::Error::new(io::ErrorKind::InvalidInput, "offset out of range");
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start.checked_add(data.len()).ok_or_else(out_of_range)?;
        if self.data.len() < end {
            self.data
                .try_reserve(end - self.data.len())
                .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.data.clear();
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn rename(&mut self, _to: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_store_is_object_safe() {
        fn _check(_: &dyn ByteStore) {}
    }

    #[test]
    fn memory_store_short_read_is_clamped() {
        let store = MemoryStore::from_bytes("hello");
        assert_eq!(store.read_at(3, 10).unwrap(), b"lo");
        assert!(store.read_at(5, 4).unwrap().is_empty());
        assert!(store.read_at(99, 4).unwrap().is_empty());
    }

    #[test]
    fn memory_store_write_past_end_zero_fills() {
        let mut store = MemoryStore::new();
        store.write_at(2, b"ab").unwrap();
        assert_eq!(store.as_bytes(), b"\0\0ab");
        store.write_at(0, b"xy").unwrap();
        assert_eq!(store.as_bytes(), b"xyab");
    }

    #[test]
    fn memory_store_rejects_unreachable_offsets() {
        let mut store = MemoryStore::from_bytes("abc");
        let err = store.write_at(u64::MAX, b"x").unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::InvalidInput | io::ErrorKind::OutOfMemory
        ));
        assert!(store.write_at(u64::MAX / 2, b"x").is_err());
        assert_eq!(store.as_bytes(), b"abc");
    }

    #[test]
    fn native_store_rejects_overflowing_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"").unwrap();

        let mut store = NativeStore::open(&path).unwrap();
        let err = store.write_at(u64::MAX, b"xy").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(store.size().unwrap(), 0);
    }

    #[test]
    fn native_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut store = NativeStore::open(&path).unwrap();
        assert_eq!(store.size().unwrap(), 10);
        assert_eq!(store.read_at(4, 3).unwrap(), b"456");
        assert_eq!(store.read_at(8, 100).unwrap(), b"89");

        store.write_at(10, b"ab").unwrap();
        store.flush().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789ab");

        store.truncate().unwrap();
        assert_eq!(store.size().unwrap(), 0);
        assert!(store.read_at(0, 4).unwrap().is_empty());
    }

    #[test]
    fn native_store_rename_keeps_handle_usable() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("old.txt");
        let to = dir.path().join("new.txt");
        std::fs::write(&from, b"keep").unwrap();

        let mut store = NativeStore::open(&from).unwrap();
        store.rename(&to).unwrap();
        assert_eq!(store.path(), to.as_path());
        assert!(!from.exists());
        assert_eq!(store.read_at(0, 4).unwrap(), b"keep");
    }

    #[test]
    fn native_store_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = NativeStore::open(dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
