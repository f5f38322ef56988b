//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_EXPIRY_CHECK_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SESSION_STORAGE_PATH,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join a request path onto the base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Session persistence and maintenance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File that mirrors the session between runs
    pub storage_path: String,
    /// How often the background monitor checks the access token expiry
    pub expiry_check_interval_secs: u64,
    pub expiry_check_enabled: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: DEFAULT_SESSION_STORAGE_PATH.to_string(),
            expiry_check_interval_secs: DEFAULT_EXPIRY_CHECK_INTERVAL_SECS,
            expiry_check_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_handles_slashes() {
        let config = ApiConfig { base_url: "https://hr.example.com/api/".to_string(), timeout_secs: 10 };

        assert_eq!(config.url_for("/employees"), "https://hr.example.com/api/employees");
        assert_eq!(config.url_for("payroll/1"), "https://hr.example.com/api/payroll/1");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "api": { "base_url": "https://hr.example.com" } }"#).unwrap();

        assert_eq!(config.api.base_url, "https://hr.example.com");
        assert_eq!(config.api.timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn default_interval_is_fifteen_minutes() {
        let config = Config::default();
        assert_eq!(config.session.expiry_check_interval(), Duration::from_secs(900));
        assert!(config.session.expiry_check_enabled);
    }
}
