//! Authenticated backend access
//!
//! # Architecture
//!
//! - [`AuthenticatedClient`] owns the transport, the [`AuthSession`] and the
//!   [`RefreshCoordinator`]
//! - A 401 joins the single in-flight refresh, then replays the request once
//! - [`SessionExpiryMonitor`] refreshes proactively on an interval through the
//!   same coordinator
//! - Session transitions are broadcast as [`SessionEvent`]s

pub mod client;
pub mod errors;
pub mod monitor;
pub mod refresh;
pub mod request;
pub mod session;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder};
pub use errors::{ApiError, ApiErrorCategory};
pub use monitor::{ExpiryCheck, ExpiryCheckOutcome, MonitorConfig, SessionExpiryMonitor};
pub use refresh::{RefreshCoordinator, RefreshFlight, RefreshOutcome};
pub use request::{ApiRequest, ApiResponse};
pub use session::{AuthSession, AuthState, LogoutReason, SessionEvent};
