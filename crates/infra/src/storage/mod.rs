//! Session storage backends

pub mod file;

pub use file::FileStorage;
