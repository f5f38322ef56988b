//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::path::PathBuf;

use adminhub_domain::AdminHubError;
use adminhub_infra::config;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write config file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "config.json",
        r#"{
            "api": {
                "base_url": "https://hr.example.com/api",
                "timeout_secs": 15
            },
            "session": {
                "storage_path": "/tmp/adminhub-session.json",
                "expiry_check_interval_secs": 300,
                "expiry_check_enabled": false
            }
        }"#,
    );

    let config = config::load_from_file(Some(path)).expect("Failed to load config from JSON file");

    assert_eq!(config.api.base_url, "https://hr.example.com/api");
    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.session.storage_path, "/tmp/adminhub-session.json");
    assert_eq!(config.session.expiry_check_interval_secs, 300);
    assert!(!config.session.expiry_check_enabled);
}

#[test]
fn test_load_config_from_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "config.toml",
        r#"
[api]
base_url = "http://127.0.0.1:5000/api"
timeout_secs = 5

[session]
storage_path = "session.json"
expiry_check_interval_secs = 60
expiry_check_enabled = true
"#,
    );

    let config = config::load_from_file(Some(path)).expect("Failed to load config from TOML file");

    assert_eq!(config.api.base_url, "http://127.0.0.1:5000/api");
    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.session.storage_path, "session.json");
    assert_eq!(config.session.expiry_check_interval_secs, 60);
    assert!(config.session.expiry_check_enabled);
}

#[test]
fn test_load_config_with_minimal_fields() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "config.json", r#"{ "api": { "base_url": "https://hr.example.com" } }"#);

    let config = config::load_from_file(Some(path)).expect("Failed to load minimal config");

    assert_eq!(config.api.base_url, "https://hr.example.com");
    assert_eq!(config.session, adminhub_domain::SessionConfig::default());
    assert!(config::validate(&config).is_ok());
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/config.json".into()));

    match result {
        Err(AdminHubError::Config(msg)) => {
            assert!(msg.contains("not found"), "Error message should mention file not found");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_load_config_with_invalid_format() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "config.json", r#"{ "this is": "not valid" "#);

    match config::load_from_file(Some(path)) {
        Err(AdminHubError::Config(msg)) => {
            assert!(msg.contains("Invalid JSON"), "Error message should mention invalid JSON");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_validate_rejects_unusable_values() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "config.toml",
        r#"
[api]
base_url = "ftp://files.example.com"
"#,
    );

    let config = config::load_from_file(Some(path)).expect("file itself parses");
    let err = config::validate(&config).unwrap_err();
    assert!(matches!(err, AdminHubError::Config(ref msg) if msg.contains("http or https")));
}
