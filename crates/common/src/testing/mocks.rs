//! Mock implementations of common traits

// Test mocks keep their error contracts in the return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::{LocalStorage, StorageError, StorageResult};

type StorageData = Arc<Mutex<HashMap<String, String>>>;
type OpLog = Arc<Mutex<Vec<StorageOp>>>;

/// A recorded storage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Get(String),
    Set(String, String),
    Remove(String),
    Clear,
}

/// Mock storage that records every call and can be told to fail
///
/// # Examples
///
/// ```
/// use adminhub_common::storage::LocalStorage;
/// use adminhub_common::testing::MockStorage;
///
/// let storage = MockStorage::new();
/// storage.set_item("adminToken", "T1").unwrap();
///
/// storage.fail_writes(true);
/// assert!(storage.set_item("adminToken", "T2").is_err());
/// assert_eq!(storage.value("adminToken").as_deref(), Some("T1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    data: StorageData,
    ops: OpLog,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording an operation.
    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.data.lock().insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Fail writes and removals of `key` only.
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().insert(key.to_string());
    }

    /// Current value, bypassing the op log.
    pub fn value(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    pub fn ops(&self) -> Vec<StorageOp> {
        self.ops.lock().clone()
    }

    /// Values ever written to `key`, in order.
    pub fn writes_to(&self, key: &str) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                StorageOp::Set(k, v) if k == key => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    fn check_write(&self, key: Option<&str>) -> StorageResult<()> {
        if *self.fail_writes.lock() {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        if let Some(key) = key.filter(|k| self.failing_keys.lock().contains(*k)) {
            return Err(StorageError::Unavailable(format!("mock write failure for {key}")));
        }
        Ok(())
    }
}

impl LocalStorage for MockStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.ops.lock().push(StorageOp::Get(key.to_string()));
        if *self.fail_reads.lock() {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ops.lock().push(StorageOp::Set(key.to_string(), value.to_string()));
        self.check_write(Some(key))?;
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.ops.lock().push(StorageOp::Remove(key.to_string()));
        self.check_write(Some(key))?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.ops.lock().push(StorageOp::Clear);
        self.check_write(None)?;
        self.data.lock().clear();
        Ok(())
    }
}
