//! Construction options for a [`FileSystem`](crate::FileSystem).

use std::path::{Path, PathBuf};

/// Options used to bind a [`FileSystem`](crate::FileSystem) to a root path.
///
/// # Example
///
/// ```rust
/// use lockfs::FsConfig;
///
/// let config = FsConfig::new("/var/lib/app").create_root(true);
/// assert!(config.creates_root());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FsConfig {
    root: PathBuf,
    create_root: bool,
}

impl FsConfig {
    /// Options for the given root, which must already exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_root: false,
        }
    }

    /// Create the root directory (and its ancestors) if it is missing.
    pub fn create_root(mut self, create: bool) -> Self {
        self.create_root = create;
        self
    }

    /// The configured root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a missing root is created.
    pub fn creates_root(&self) -> bool {
        self.create_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_create_root() {
        let config = FsConfig::new("data");
        assert_eq!(config.root(), Path::new("data"));
        assert!(!config.creates_root());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: FsConfig = serde_json::from_str(r#"{"root":"data"}"#).unwrap();
        assert_eq!(config, FsConfig::new("data"));
    }
}
