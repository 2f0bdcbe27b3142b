//! # Extension Traits
//!
//! Convenience methods layered over [`File`].
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`FileJson`] adds:
//!
//! | Method | Description |
//! |--------|-------------|
//! | `read_json` | Read and deserialize the whole file as JSON |
//! | `write_json` | Serialize a value and replace the file's contents |
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! lockfs = { version = "0.1", features = ["serde"] }
//! ```

#[cfg(feature = "serde")]
mod json {
    use serde::{Serialize, de::DeserializeOwned};

    use crate::{File, FsError};

    /// JSON helpers for [`File`].
    ///
    /// Both methods go through the file's own lock, so a concurrent
    /// `write_json` is observed whole or not at all.
    pub trait FileJson {
        /// Read the file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::InvalidData` — File isn't valid UTF-8
        /// - `FsError::Deserialization` — JSON parsing failed
        fn read_json<T: DeserializeOwned>(&self) -> Result<T, FsError>;

        /// Serialize a value as pretty-printed JSON and replace the file's
        /// contents with it.
        ///
        /// # Errors
        ///
        /// - `FsError::Serialization` — JSON serialization failed
        fn write_json<T: Serialize>(&self, value: &T) -> Result<(), FsError>;
    }

    impl FileJson for File {
        fn read_json<T: DeserializeOwned>(&self) -> Result<T, FsError> {
            let data = self.get_contents_string()?;
            serde_json::from_str(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }

        fn write_json<T: Serialize>(&self, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            self.set_contents(json)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::MemoryStore;
        use std::collections::BTreeMap;

        #[test]
        fn json_round_trip() {
            let file = File::with_store("config.json", MemoryStore::new());
            let mut value = BTreeMap::new();
            value.insert("threads".to_string(), 4);
            file.write_json(&value).unwrap();

            let back: BTreeMap<String, i32> = file.read_json().unwrap();
            assert_eq!(back, value);
        }

        #[test]
        fn malformed_json_is_a_deserialization_error() {
            let file = File::with_store("config.json", MemoryStore::from_bytes("{nope"));
            let err = file.read_json::<serde_json::Value>().unwrap_err();
            assert!(matches!(err, FsError::Deserialization(_)));
        }
    }
}

#[cfg(feature = "serde")]
pub use json::FileJson;
