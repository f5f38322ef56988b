//! Application constants
//!
//! Backend endpoint paths and the defaults used when configuration leaves a
//! value unset.

// Backend
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";

// Transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Session maintenance
pub const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_SESSION_STORAGE_PATH: &str = "adminhub-session.json";
