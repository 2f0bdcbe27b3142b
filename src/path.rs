//! Decomposition of relative paths into walkable segments.
//!
//! Every path handed to a [`FileSystem`](crate::FileSystem) is split here
//! before any directory is touched, so rejection of absolute paths and
//! non-UTF-8 names happens up front.

use std::path::{Component, Path, PathBuf};

use crate::FsError;

/// One step of a walk through the directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// `.`: stay in the current directory.
    Current,
    /// `..`: move to the parent directory.
    Parent,
    /// A named child.
    Name(&'a str),
}

/// Split a relative path into segments.
///
/// Empty segments (`a//b`) never appear; `std::path` already drops them.
///
/// # Errors
///
/// - [`FsError::InvalidPath`] if the path is absolute or carries a root or prefix
/// - [`FsError::InvalidName`] if a segment is not valid UTF-8
pub(crate) fn segments(path: &Path) -> Result<Vec<Segment<'_>>, FsError> {
    if path.is_absolute() || path.has_root() {
        return Err(must_be_relative(path));
    }
    path.components()
        .map(|component| match component {
            Component::CurDir => Ok(Segment::Current),
            Component::ParentDir => Ok(Segment::Parent),
            Component::Normal(name) => name.to_str().map(Segment::Name).ok_or_else(|| {
                FsError::InvalidName {
                    name: name.to_string_lossy().into_owned(),
                }
            }),
            Component::RootDir | Component::Prefix(_) => Err(must_be_relative(path)),
        })
        .collect()
}

/// Check that `name` is exactly one normal path component.
///
/// # Errors
///
/// - [`FsError::InvalidName`] for empty names, `.`, `..`, or names containing
///   a separator
pub(crate) fn validate_name(name: &str) -> Result<(), FsError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(single)), None) if single == name => Ok(()),
        _ => Err(FsError::InvalidName {
            name: name.to_owned(),
        }),
    }
}

fn must_be_relative(path: &Path) -> FsError {
    FsError::InvalidPath {
        path: PathBuf::from(path),
        reason: "path must be relative to the filesystem root",
    }
}
