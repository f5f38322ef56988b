//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from built-in defaults
//! 2. Layer the first config file found by [`probe_config_paths`] on top
//! 3. Apply environment variable overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `ADMINHUB_API_BASE_URL`: Backend base URL (falls back to
//!   `VITE_API_BASE_URL`)
//! - `ADMINHUB_API_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `ADMINHUB_SESSION_STORAGE_PATH`: File the session is mirrored to
//! - `ADMINHUB_EXPIRY_CHECK_INTERVAL_SECS`: Expiry check interval in seconds
//! - `ADMINHUB_EXPIRY_CHECK_ENABLED`: Whether the expiry monitor runs
//!   (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./adminhub.json` or `./adminhub.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use adminhub_domain::{AdminHubError, Config, Result};
use url::Url;

/// Load configuration: defaults, then file, then environment
///
/// A missing config file is not an error; defaults are used instead.
///
/// # Errors
/// Returns `AdminHubError::Config` if a config file exists but cannot be
/// parsed, an environment variable holds an invalid value, or the result
/// fails validation.
pub fn load() -> Result<Config> {
    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;

    tracing::info!(base_url = %config.api.base_url, "Configuration loaded");
    Ok(config)
}

/// Load configuration from defaults and environment variables only
///
/// # Errors
/// Returns `AdminHubError::Config` if a variable has an invalid value or the
/// result fails validation.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension). Fields
/// missing from the file keep their defaults.
///
/// # Errors
/// Returns `AdminHubError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AdminHubError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AdminHubError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AdminHubError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Apply `ADMINHUB_*` environment overrides to `config`
///
/// # Errors
/// Returns `AdminHubError::Config` if a numeric variable does not parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(base_url) = env_opt("ADMINHUB_API_BASE_URL").or_else(|| env_opt("VITE_API_BASE_URL"))
    {
        config.api.base_url = base_url;
    }
    if let Some(timeout) = env_u64("ADMINHUB_API_TIMEOUT_SECS")? {
        config.api.timeout_secs = timeout;
    }
    if let Some(path) = env_opt("ADMINHUB_SESSION_STORAGE_PATH") {
        config.session.storage_path = path;
    }
    if let Some(interval) = env_u64("ADMINHUB_EXPIRY_CHECK_INTERVAL_SECS")? {
        config.session.expiry_check_interval_secs = interval;
    }
    config.session.expiry_check_enabled =
        env_bool("ADMINHUB_EXPIRY_CHECK_ENABLED", config.session.expiry_check_enabled);
    Ok(())
}

/// Check that `config` is usable
///
/// # Errors
/// Returns `AdminHubError::Config` if the base URL is not an absolute
/// http(s) URL, or the timeout or check interval is zero.
pub fn validate(config: &Config) -> Result<()> {
    let url = Url::parse(&config.api.base_url).map_err(|e| {
        AdminHubError::Config(format!("Invalid API base URL '{}': {}", config.api.base_url, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AdminHubError::Config(format!(
            "API base URL must use http or https: {}",
            config.api.base_url
        )));
    }
    if config.api.timeout_secs == 0 {
        return Err(AdminHubError::Config("API timeout must be greater than zero".to_string()));
    }
    if config.session.expiry_check_interval_secs == 0 {
        return Err(AdminHubError::Config(
            "Expiry check interval must be greater than zero".to_string(),
        ));
    }
    if config.session.storage_path.trim().is_empty() {
        return Err(AdminHubError::Config("Session storage path must not be empty".to_string()));
    }
    Ok(())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `AdminHubError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AdminHubError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AdminHubError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AdminHubError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_paths(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_paths(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("adminhub.json"),
        dir.join("adminhub.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    env_opt(key)
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| AdminHubError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
