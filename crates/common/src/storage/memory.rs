//! In-process storage backend

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{LocalStorage, StorageResult};

/// `LocalStorage` kept in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.items.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set_item("adminToken", "T1").unwrap();
        assert_eq!(other.get_item("adminToken").unwrap().as_deref(), Some("T1"));

        other.remove_item("adminToken").unwrap();
        other.remove_item("adminToken").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        assert_eq!(storage.len(), 2);

        storage.clear().unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
        assert!(storage.is_empty());
    }
}
