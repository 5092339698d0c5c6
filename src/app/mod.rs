//! Core application logic for the SQLite loader
//!
//! This module contains the HTTP client, manifest parsing, source selection,
//! the streaming and in-memory transfer paths, durable storage, the
//! version-gated cache and the database opener.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlite_loader::app::{
//!     run_query, CacheConfig, CacheManager, Decompressors, LoadOptions, Loader, LoaderClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LoaderClient::new()?;
//! let cache = CacheManager::from_config(&CacheConfig::default(), client.clone(), Decompressors::detect());
//! let loader = Loader::new(client, cache);
//!
//! let loaded = loader
//!     .load_database("https://example.com/data/manifest.json", &LoadOptions::default())
//!     .await?;
//! println!("Version {} ({})", loaded.version, loaded.location);
//!
//! let output = run_query(loaded.db.as_ref(), "SELECT name FROM sqlite_master", 50).await?;
//! for row in output.rows {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod codec;
pub mod database;
pub mod hash;
pub mod loader;
pub mod manifest;
pub mod selector;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main public API
pub use cache::{
    CacheConfig, CacheManager, CacheRecord, FileRecordStore, LoadOptions, Location,
    MemoryRecordStore, RecordStore, StoreResult,
};
pub use client::{ClientConfig, LoaderClient};
pub use codec::{Decompressors, Encoding};
pub use database::{
    open_database, run_query, Database, LoadedDatabase, QueryEngine, QueryOutput, Row,
    SqliteEngine, Statement,
};
pub use hash::Md5Hash;
pub use loader::Loader;
pub use manifest::{load_manifest, Manifest, SourceDescriptor, Sources};
pub use selector::{pick_source, ResolvedSource, SourceKind};
pub use store::{DurableStore, FileHandle, LocalStore, MemoryStore, StorageAdapter};
pub use transfer::{
    download_to_memory, progress_channel, ProgressReceiver, ProgressSender, StreamingTransfer,
    TransferEvent,
};
