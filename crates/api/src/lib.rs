//! # AdminHub App
//!
//! Application layer: wiring and the binary entry point.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `common`, and `infra`
//! - Owns the lifecycle of the session client and its expiry monitor

pub mod context;
pub mod utils;

pub use context::*;
