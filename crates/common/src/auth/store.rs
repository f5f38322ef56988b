//! Durable session mirror
//!
//! Maps a [`Session`] onto five string keys of a [`LocalStorage`]. Absent
//! values remove their key; the store never writes placeholder strings. Values
//! left behind by older clients (`""`, `"undefined"`, `"null"`) read back as
//! absent.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::types::{RefreshedTokens, Session};
use crate::storage::{LocalStorage, StorageResult, StorageWrite};

/// Storage keys owned by the session store
pub mod keys {
    pub const ACCESS_TOKEN: &str = "adminToken";
    pub const REFRESH_TOKEN: &str = "adminRefreshToken";
    pub const USER: &str = "adminData";
    pub const EMPLOYEE: &str = "adminEmployee";
    pub const COMPANY_ID: &str = "adminCompanyId";

    pub const ALL: [&str; 5] = [ACCESS_TOKEN, REFRESH_TOKEN, USER, EMPLOYEE, COMPANY_ID];
}

/// Treat empty strings and serialized placeholders as "no value".
#[must_use]
pub fn normalize_stored_token(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let trimmed = v.trim();
        !trimmed.is_empty() && trimmed != "undefined" && trimmed != "null"
    })
}

/// Session persistence over a `LocalStorage` backend
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Persist every field of `session` in one batch.
    ///
    /// # Errors
    /// Returns `StorageError` if a profile cannot be encoded or the backend
    /// rejects a write.
    pub fn save(&self, session: &Session) -> StorageResult<()> {
        self.storage.write_batch(&[
            put(keys::ACCESS_TOKEN, Some(session.access_token.as_str())),
            put(keys::REFRESH_TOKEN, session.refresh_token.as_deref()),
            put_json(keys::USER, &session.user)?,
            put_json(keys::EMPLOYEE, &session.employee)?,
            put(keys::COMPANY_ID, session.company_id.as_deref()),
        ])?;

        debug!(has_refresh_token = session.refresh_token.is_some(), "session persisted");
        Ok(())
    }

    /// Read the persisted session, `None` when no access token is stored.
    ///
    /// Expired tokens are returned as-is. Corrupt profile JSON reads back as
    /// `null`.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    pub fn load(&self) -> StorageResult<Option<Session>> {
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };

        Ok(Some(Session {
            access_token,
            refresh_token: self.refresh_token()?,
            user: self.get_json(keys::USER)?,
            employee: self.get_json(keys::EMPLOYEE)?,
            company_id: normalize_stored_token(self.storage.get_item(keys::COMPANY_ID)?),
        }))
    }

    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        Ok(normalize_stored_token(self.storage.get_item(keys::ACCESS_TOKEN)?))
    }

    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        Ok(normalize_stored_token(self.storage.get_item(keys::REFRESH_TOKEN)?))
    }

    /// Persist the result of a refresh. The stored refresh token is replaced
    /// only when a new one was issued.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend rejects a write.
    pub fn store_tokens(&self, tokens: &RefreshedTokens) -> StorageResult<()> {
        let mut writes = vec![put(keys::ACCESS_TOKEN, Some(tokens.access_token.as_str()))];
        if let Some(refresh_token) = tokens.refresh_token.as_deref() {
            writes.push(put(keys::REFRESH_TOKEN, Some(refresh_token)));
        }
        self.storage.write_batch(&writes)
    }

    /// Remove every session key.
    ///
    /// One failing key does not stop the others from being removed.
    ///
    /// # Errors
    /// Returns the first `StorageError` raised by a removal.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.write_batch(&keys::ALL.map(|key| StorageWrite::Remove(key.to_string())))
    }

    fn get_json(&self, key: &str) -> StorageResult<Value> {
        let Some(raw) = normalize_stored_token(self.storage.get_item(key)?) else {
            return Ok(Value::Null);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(key, error = %err, "discarding corrupt stored profile");
                Ok(Value::Null)
            }
        }
    }
}

fn put(key: &str, value: Option<&str>) -> StorageWrite {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => StorageWrite::Set(key.to_string(), v.to_string()),
        None => StorageWrite::Remove(key.to_string()),
    }
}

fn put_json(key: &str, value: &Value) -> StorageResult<StorageWrite> {
    if value.is_null() {
        return Ok(StorageWrite::Remove(key.to_string()));
    }
    Ok(StorageWrite::Set(key.to_string(), serde_json::to_string(value)?))
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (SessionStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        (SessionStore::new(Arc::new(storage.clone())), storage)
    }

    #[test]
    fn save_and_load_full_session() {
        let (store, _) = store();
        let session = Session {
            access_token: "T1".into(),
            refresh_token: Some("R1".into()),
            user: json!({ "id": 1 }),
            employee: json!({ "id": 2, "company_id": 5 }),
            company_id: Some("5".into()),
        };

        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[test]
    fn missing_values_remove_keys_instead_of_writing_placeholders() {
        let (store, storage) = store();
        storage.set_item(keys::REFRESH_TOKEN, "stale").unwrap();

        store.save(&Session::new("T1", None)).unwrap();

        assert_eq!(storage.get_item(keys::REFRESH_TOKEN).unwrap(), None);
        assert_eq!(storage.get_item(keys::USER).unwrap(), None);
        assert_eq!(storage.get_item(keys::COMPANY_ID).unwrap(), None);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn sentinel_refresh_tokens_read_as_absent() {
        let (store, storage) = store();
        for sentinel in ["", "undefined", "null", "  "] {
            storage.set_item(keys::REFRESH_TOKEN, sentinel).unwrap();
            assert_eq!(store.refresh_token().unwrap(), None, "sentinel {sentinel:?}");
        }
    }

    #[test]
    fn store_tokens_rotates_only_when_issued() {
        let (store, _) = store();
        store.save(&Session::new("T1", Some("R1".into()))).unwrap();

        store
            .store_tokens(&RefreshedTokens { access_token: "T2".into(), refresh_token: None })
            .unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));

        store
            .store_tokens(&RefreshedTokens {
                access_token: "T3".into(),
                refresh_token: Some("R3".into()),
            })
            .unwrap();
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R3"));
    }

    #[test]
    fn corrupt_profile_restores_as_null() {
        let (store, storage) = store();
        storage.set_item(keys::ACCESS_TOKEN, "T1").unwrap();
        storage.set_item(keys::USER, "{not json").unwrap();

        let session = store.load().unwrap().unwrap();
        assert_eq!(session.user, Value::Null);
    }

    #[test]
    fn clear_leaves_foreign_keys() {
        let (store, storage) = store();
        storage.set_item("theme", "dark").unwrap();
        store.save(&Session::new("T1", Some("R1".into()))).unwrap();

        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
    }
}
