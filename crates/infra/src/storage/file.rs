//! File-backed `LocalStorage`
//!
//! The whole key/value map lives in one JSON object on disk. Every write
//! replaces the file through a temp file and rename, so a crash leaves either
//! the old or the new contents. A batch is committed with a single rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use adminhub_common::{LocalStorage, StorageError, StorageResult, StorageWrite};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Write-through JSON map file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    // Held for the whole read-modify-persist cycle; readers only take `items`
    commit: Mutex<()>,
}

impl FileStorage {
    /// Open `path`, treating a missing file as empty.
    ///
    /// A file that is not a JSON object of strings is discarded with a
    /// warning; the next write replaces it.
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(items) => items,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "discarding corrupt session file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), keys = items.len(), "opened session storage");
        Ok(Self { path, items: Mutex::new(items), commit: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(items)?;
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)
            .map_err(|e| StorageError::Io(format!("failed to replace {}: {e}", self.path.display())))
    }

    /// Apply `change` and persist; memory is only updated if the write lands.
    ///
    /// Reads keep seeing the previous contents while the file is written.
    fn mutate(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> StorageResult<()> {
        let _commit = self.commit.lock();
        let mut next = self.items.lock().clone();
        change(&mut next);
        if next == *self.items.lock() {
            return Ok(());
        }
        self.persist(&next)?;
        *self.items.lock() = next;
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(BTreeMap::clear)
    }

    fn write_batch(&self, writes: &[StorageWrite]) -> StorageResult<()> {
        self.mutate(|items| {
            for write in writes {
                match write {
                    StorageWrite::Set(key, value) => {
                        items.insert(key.clone(), value.clone());
                    }
                    StorageWrite::Remove(key) => {
                        items.remove(key);
                    }
                }
            }
        })
    }
}
