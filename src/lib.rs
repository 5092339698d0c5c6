//! SQLite Loader Library
//!
//! Fetches a versioned, compressed SQLite database described by a JSON
//! manifest, decompresses it while streaming into durable local storage and
//! reuses the stored copy until the manifest version changes. When durable
//! storage or streaming decompression is unavailable the database is
//! downloaded and decoded in memory instead.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
