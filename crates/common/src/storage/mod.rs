//! Key/value storage the session is mirrored into
//!
//! The interface is localStorage-shaped: string keys, string values,
//! synchronous calls. Implementations may block on disk; async callers run
//! them on the blocking pool.

pub mod error;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;

/// One entry of a [`LocalStorage::write_batch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageWrite {
    Set(String, String),
    Remove(String),
}

impl StorageWrite {
    pub fn key(&self) -> &str {
        match self {
            Self::Set(key, _) | Self::Remove(key) => key,
        }
    }
}

/// Synchronous string key/value store
pub trait LocalStorage: Send + Sync {
    /// Read a value, `None` when the key is absent.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Remove every key.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    fn clear(&self) -> StorageResult<()>;

    /// Apply several writes as one unit.
    ///
    /// The default applies them in order through `set_item`/`remove_item`,
    /// attempting every write and returning the first error. Backends with a
    /// costly commit override it to commit once.
    ///
    /// # Errors
    /// Returns the first `StorageError` raised by the batch.
    fn write_batch(&self, writes: &[StorageWrite]) -> StorageResult<()> {
        let mut first_error = None;
        for write in writes {
            let result = match write {
                StorageWrite::Set(key, value) => self.set_item(key, value),
                StorageWrite::Remove(key) => self.remove_item(key),
            };
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
