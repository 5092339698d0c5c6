//! Version-gated artifact cache
//!
//! The durable file is only trusted while the cache record names the same
//! manifest version and file name. The record is the source of truth: it is
//! cleared before any new durable download starts and written only after
//! the download has been committed, so an interrupted or failed transfer
//! can never be mistaken for a cache hit.
//!
//! # Module Organization
//!
//! - [`config`] - Cache configuration and per-call load options
//! - [`record`] - Cache record type and its persistence
//! - [`result`] - `StoreResult` returned to the database opener
//! - [`manager`] - Cache manager tying selection, transfer and record together
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlite_loader::app::cache::{CacheConfig, CacheManager, LoadOptions};
//! use sqlite_loader::app::client::LoaderClient;
//! use sqlite_loader::app::codec::Decompressors;
//! use sqlite_loader::app::manifest::load_manifest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LoaderClient::new()?;
//! let cache = CacheManager::from_config(&CacheConfig::default(), client.clone(), Decompressors::detect());
//!
//! let manifest = load_manifest(&client, "https://example.com/manifest.json").await?;
//! let stored = cache.ensure_stored(&manifest, &LoadOptions::default()).await?;
//! println!("{} at version {}", stored.location(), stored.version());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod record;
pub mod result;

#[cfg(test)]
mod tests;

pub use config::{CacheConfig, LoadOptions};
pub use manager::CacheManager;
pub use record::{CacheRecord, FileRecordStore, MemoryRecordStore, RecordStore};
pub use result::{Location, StoreResult};
