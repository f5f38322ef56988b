//! Session and token primitives
//!
//! - [`claims`]: unverified JWT payload decoding and the local expiry check
//! - [`types`]: the session model and the login/refresh payload parsers
//! - [`store`]: the durable mirror of a session over [`LocalStorage`]
//!
//! [`LocalStorage`]: crate::storage::LocalStorage

pub mod claims;
#[cfg(feature = "runtime")]
pub mod store;
pub mod types;

pub use claims::{decode_claims, is_token_expired, is_token_expired_at, ClaimsError, TokenClaims};
#[cfg(feature = "runtime")]
pub use store::{keys, normalize_stored_token, SessionStore};
pub use types::{unwrap_envelope, LoginCredentials, PayloadError, RefreshedTokens, Session};
