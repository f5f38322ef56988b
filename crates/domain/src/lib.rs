//! # AdminHub Domain
//!
//! Domain types shared by every AdminHub crate.
//!
//! This crate contains:
//! - The domain error type and `Result` alias
//! - Configuration structures
//! - Backend endpoint and default-value constants
//!
//! ## Architecture
//! - No dependencies on other AdminHub crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
