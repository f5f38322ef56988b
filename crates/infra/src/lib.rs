//! # AdminHub Infrastructure
//!
//! Everything that touches the network or the filesystem:
//! - the authenticated API client and its token refresh protocol
//! - the HTTP transport
//! - configuration loading
//! - file-backed session storage
//!
//! ## Architecture
//! - Builds on the session and storage primitives in `adminhub-common`
//! - Reports failures as `ApiError` or `adminhub_domain::AdminHubError`

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod storage;

// Re-export commonly used items
pub use api::{
    ApiError, ApiRequest, ApiResponse, AuthState, AuthenticatedClient, ExpiryCheck,
    ExpiryCheckOutcome, LogoutReason, MonitorConfig, SessionEvent, SessionExpiryMonitor,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use storage::FileStorage;
