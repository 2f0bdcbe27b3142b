//! # lockfs
//!
//! A process-local, thread-safe caching layer over a directory subtree.
//!
//! A [`FileSystem`] maps relative paths to long-lived, lock-protected
//! [`File`] and [`Directory`] handles, so many threads can read and write the
//! same files without corrupting content or opening the same file twice.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use lockfs::FileSystem;
//! use std::sync::Arc;
//!
//! let tmp = tempfile::tempdir()?;
//! let fs = FileSystem::new(tmp.path())?;
//!
//! // Parent directories are created on the way down.
//! let file = fs.open_file("a/b/c.txt")?;
//! file.set_contents("hello")?;
//!
//! // The same path always resolves to the same handle.
//! let again = fs.open_file("a/b/c.txt")?;
//! assert!(Arc::ptr_eq(&file, &again));
//! assert_eq!(again.get_contents_string()?, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileSystem`] | Owns the root and resolves relative paths |
//! | [`Directory`] | Caches child handles; lookup-or-create by name |
//! | [`File`] | Locked read/write/append over one [`ByteStore`] |
//! | [`ByteStore`] | The byte-addressable capability behind a `File` |
//! | [`FsError`] | Error type with path context |
//! | [`FsConfig`] | Root path and creation options |
//!
//! Supporting modules: [`logging`] (leveled sinks and a [`log`] backend) and
//! [`time`] (clocks and stopwatches).
//!
//! ---
//!
//! ## Guarantees
//!
//! - **One handle per path.** Within one `FileSystem`, resolving a path twice
//!   (from any threads) returns the same `Arc`.
//! - **Whole writes.** `write`, `append` and `set_contents` each run under the
//!   file's exclusive lock; readers see either all of a write or none of it.
//! - **No lock nesting.** A directory's lock is released before any child or
//!   parent is locked.
//!
//! ## Known Limitations
//!
//! - Lock acquisition blocks indefinitely; there are no timeouts.
//! - Cached entries are not invalidated when the disk changes underneath them.
//! - Safety holds among threads sharing one `FileSystem`, not across
//!   processes or across separate `FileSystem` instances.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`FsConfig`] and [`EntryKind`]; JSON helpers on [`File`] |

// Private modules
mod config;
mod directory;
mod error;
mod ext;
mod file;
mod filesystem;
mod path;
mod store;
mod types;

// Public modules
pub mod logging;
pub mod time;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use config::FsConfig;
pub use directory::Directory;
pub use file::File;
pub use filesystem::FileSystem;
pub use store::{ByteStore, MemoryStore, NativeStore};
pub use types::EntryKind;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FileJson;
