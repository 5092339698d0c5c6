//! Prelude module for the SQLite loader library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use sqlite_loader::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sqlite_loader::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = LoaderClient::new()?;
//!     let cache = CacheManager::from_config(&CacheConfig::default(), client.clone(), Decompressors::detect());
//!     let loader = Loader::new(client, cache);
//!
//!     let loaded = loader
//!         .load_database("https://example.com/data/manifest.json", &LoadOptions::default())
//!         .await?;
//!     let output = run_query(loaded.db.as_ref(), "SELECT COUNT(*) FROM sqlite_master", 1).await?;
//!     println!("{:?}", output.rows);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    open_database, run_query, CacheConfig, CacheManager, ClientConfig, Decompressors, Encoding,
    LoadOptions, LoadedDatabase, Loader, LoaderClient, Location, Manifest, QueryOutput,
    ResolvedSource, StoreResult, TransferEvent,
};
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_FILE_NAME, DEFAULT_QUERY_LIMIT, USER_AGENT};

// Cancellation is part of `LoadOptions`
pub use tokio_util::sync::CancellationToken;

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
