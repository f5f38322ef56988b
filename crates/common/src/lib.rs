//! Shared building blocks for the AdminHub session client.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: token claims, session payload types
//! - `runtime`: key/value storage and the durable session store
//! - `observability`: tracing events (pulled in by `runtime`)
//! - `test-utils`: JWT fixtures and mock storage for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{
    decode_claims, is_token_expired, is_token_expired_at, LoginCredentials, PayloadError,
    RefreshedTokens, Session, TokenClaims,
};
#[cfg(feature = "runtime")]
pub use auth::{normalize_stored_token, SessionStore};
#[cfg(feature = "runtime")]
pub use storage::{LocalStorage, MemoryStorage, StorageError, StorageResult, StorageWrite};
