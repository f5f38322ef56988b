//! Integration tests for the auth module
//!
//! Exercises login payload parsing, the durable session store and token expiry
//! checks together, the way the session client uses them.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use adminhub_common::auth::keys;
use adminhub_common::testing::{expired_jwt, valid_jwt, MockStorage, StorageOp};
use adminhub_common::{is_token_expired, RefreshedTokens, Session, SessionStore, StorageError};
use serde_json::json;

fn store_over(storage: &MockStorage) -> SessionStore {
    SessionStore::new(Arc::new(storage.clone()))
}

/// Validates that a login response survives a save/load cycle through
/// storage, including the derived company id.
///
/// # Test Steps
/// 1. Parse an enveloped login payload
/// 2. Persist it and read it back through a fresh store
/// 3. Verify all five keys were written and the restored session matches
#[test]
fn test_login_payload_persists_and_restores() {
    let access = valid_jwt();
    let session = Session::from_login_payload(json!({
        "success": true,
        "data": {
            "access_token": access,
            "refresh_token": "R1",
            "user": { "id": 1, "name": "Ada" },
            "employee": { "id": 2, "company_id": 12 }
        }
    }))
    .expect("login payload should parse");

    let storage = MockStorage::new();
    store_over(&storage).save(&session).expect("save should succeed");

    for key in keys::ALL {
        assert!(storage.value(key).is_some(), "{key} should be stored");
    }
    assert_eq!(storage.value(keys::COMPANY_ID).as_deref(), Some("12"));

    let restored = store_over(&storage).load().unwrap().expect("session should restore");
    assert_eq!(restored, session);
    assert!(!is_token_expired(&restored.access_token));
}

/// Validates that an expired session is still restored so it can be refreshed
/// on the next visit.
#[test]
fn test_expired_session_is_restored() {
    let storage = MockStorage::new()
        .with_item(keys::ACCESS_TOKEN, &expired_jwt())
        .with_item(keys::REFRESH_TOKEN, "R1");

    let restored = store_over(&storage).load().unwrap().expect("session should restore");

    assert!(is_token_expired(&restored.access_token));
    assert_eq!(restored.refresh_token.as_deref(), Some("R1"));
}

/// Validates that placeholder strings written by older clients never reach
/// the session as tokens, and that the store itself never writes them.
///
/// # Test Steps
/// 1. Seed `"undefined"` / `"null"` placeholders
/// 2. Load and verify they read as absent
/// 3. Save a session without a refresh token and check no placeholder was
///    written
#[test]
fn test_sentinel_tokens_are_never_used_or_written() {
    let storage = MockStorage::new()
        .with_item(keys::ACCESS_TOKEN, "T1")
        .with_item(keys::REFRESH_TOKEN, "undefined")
        .with_item(keys::COMPANY_ID, "null");
    let store = store_over(&storage);

    let restored = store.load().unwrap().unwrap();
    assert_eq!(restored.refresh_token, None);
    assert_eq!(restored.company_id, None);

    store.save(&restored).unwrap();

    let sentinel_writes = storage
        .ops()
        .into_iter()
        .filter(|op| matches!(op, StorageOp::Set(_, v) if v == "undefined" || v == "null"))
        .count();
    assert_eq!(sentinel_writes, 0);
    assert_eq!(storage.value(keys::REFRESH_TOKEN), None);
}

/// Validates refresh-token rotation: the stored refresh token changes only
/// when the backend issues a new one.
#[test]
fn test_refresh_rotation_through_store() {
    let storage = MockStorage::new();
    let store = store_over(&storage);
    store.save(&Session::new("T1", Some("R1".to_string()))).unwrap();

    let unrotated = RefreshedTokens::from_payload(json!({ "access_token": "T2" })).unwrap();
    store.store_tokens(&unrotated).unwrap();
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));

    let rotated = RefreshedTokens::from_payload(json!({
        "success": true,
        "data": { "access_token": "T3", "refresh_token": "R3" }
    }))
    .unwrap();
    store.store_tokens(&rotated).unwrap();

    assert_eq!(storage.writes_to(keys::ACCESS_TOKEN), vec!["T1", "T2", "T3"]);
    assert_eq!(storage.writes_to(keys::REFRESH_TOKEN), vec!["R1", "R3"]);
}

/// Validates that backend failures surface as storage errors instead of
/// silently dropping the session.
#[test]
fn test_storage_failures_propagate() {
    let storage = MockStorage::new().with_item(keys::ACCESS_TOKEN, "T1");
    let store = store_over(&storage);

    storage.fail_writes(true);
    assert!(matches!(store.clear(), Err(StorageError::Unavailable(_))));
    assert_eq!(storage.value(keys::ACCESS_TOKEN).as_deref(), Some("T1"));

    storage.fail_writes(false);
    storage.fail_reads(true);
    assert!(store.load().is_err());
}

/// Validates that clearing keeps going past a key that cannot be removed.
///
/// # Test Steps
/// 1. Persist a full session
/// 2. Make removal of the access token fail
/// 3. Verify every other key is gone and the first error is reported
#[test]
fn test_clear_removes_remaining_keys_after_a_failure() {
    let storage = MockStorage::new();
    let store = store_over(&storage);
    let mut session = Session::new("T1", Some("R1".to_string()));
    session.user = json!({ "id": 1 });
    session.employee = json!({ "id": 2 });
    session.company_id = Some("12".to_string());
    store.save(&session).unwrap();

    storage.fail_writes_to(keys::ACCESS_TOKEN);
    let result = store.clear();

    assert!(matches!(
        result,
        Err(StorageError::Unavailable(message)) if message.contains(keys::ACCESS_TOKEN)
    ));
    assert_eq!(storage.value(keys::ACCESS_TOKEN).as_deref(), Some("T1"));
    for key in keys::ALL.iter().filter(|key| **key != keys::ACCESS_TOKEN) {
        assert_eq!(storage.value(key), None, "{key} should be removed");
    }
    let removals = storage.ops().iter().filter(|op| matches!(op, StorageOp::Remove(_))).count();
    assert_eq!(removals, keys::ALL.len());
}
