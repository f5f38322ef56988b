//! Testing utilities and helpers
//!
//! - **[`fixtures`]**: JWT builders with controlled expiry
//! - **[`mocks`]**: `LocalStorage` mock with call recording and failure
//!   injection
//!
//! ## Usage
//!
//! ```rust
//! use adminhub_common::testing::{expired_jwt, valid_jwt};
//! use adminhub_common::is_token_expired;
//!
//! assert!(is_token_expired(&expired_jwt()));
//! assert!(!is_token_expired(&valid_jwt()));
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{expired_jwt, jwt_expiring_in, jwt_with_claims, jwt_with_exp, valid_jwt};
pub use mocks::{MockStorage, StorageOp};
