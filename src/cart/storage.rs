//! Cart Storage
//!
//! The persistent key-value slot the cart is written to.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error reading or writing the slot
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),

    /// The write would take the backend past its quota
    #[error("storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded {
        /// Bytes the backend would hold after the write
        needed: usize,
        /// Bytes the backend may hold
        quota: usize,
    },

    /// The key cannot be used as a slot name
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A persistent key-value slot holding text.
///
/// The slot is synchronous. Calls are made while the cart service holds its store
/// lock, so implementations should finish quickly; a cart is a few hundred bytes.
pub trait CartStorage: Send {
    /// Read the text stored under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Erase `key`. Erasing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage with an optional byte quota across all slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: FxHashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage that rejects writes past `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: FxHashMap::default(),
            quota: Some(quota),
        }
    }

    fn used_except(&self, key: &str) -> usize {
        self.slots
            .iter()
            .filter(|(slot, _)| slot.as_str() != key)
            .map(|(slot, value)| slot.len() + value.len())
            .sum()
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_except(key) + key.len() + value.len();

            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        self.slots.insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.slots.remove(key);

        Ok(())
    }
}

/// Storage keeping one `<key>.json` file per slot inside a directory.
///
/// Uses blocking `std::fs` calls. Each call touches one small file and runs on the
/// caller's thread, including inside async cart operations.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CartStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let staging = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir)?;
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)?) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}
