//! Application constants for the SQLite loader
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides `[loader] manifest_url`
    pub const MANIFEST_URL: &str = "SQLITE_LOADER_MANIFEST_URL";

    /// Overrides `[storage] root`
    pub const STORAGE_ROOT: &str = "SQLITE_LOADER_STORAGE_ROOT";

    /// Overrides `[logging] level`
    pub const LOG_LEVEL: &str = "SQLITE_LOADER_LOG_LEVEL";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("sqlite-loader/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;

    /// Header value used to bypass intermediary caches for the manifest
    pub const NO_CACHE: &str = "no-cache";
}

/// Defaults mirrored by the loader options and the configuration file
pub mod defaults {
    /// Name of the artifact inside durable storage
    pub const FILE_NAME: &str = "db.sqlite";

    /// Prefer the brotli source when the manifest offers one
    pub const PREFER_BROTLI: bool = true;

    /// Maximum number of rows returned by a query
    pub const QUERY_LIMIT: usize = 200;

    /// Directory name under the platform data directory
    pub const APP_DIR_NAME: &str = "sqlite-loader";
}

/// Cache record keys, kept stable for the persisted record document
pub mod record {
    /// Version tag of the stored artifact
    pub const VERSION_KEY: &str = "sqlite.version";

    /// File name of the stored artifact
    pub const FILE_KEY: &str = "sqlite.file";

    /// JSON-serialized source used to produce the stored artifact
    pub const SOURCE_KEY: &str = "sqlite.source";

    /// Time the record was written
    pub const STORED_AT_KEY: &str = "sqlite.stored_at";

    /// Default record file name under the storage root
    pub const RECORD_FILE_NAME: &str = "cache_record.json";
}

/// File operation constants
pub mod files {
    /// Suffix for in-progress writes, committed by rename on close
    pub const PARTIAL_FILE_SUFFIX: &str = ".part";

    /// Suffix for the record file while it is being replaced
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Read size for the streaming transfer loop (64KB)
    pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use defaults::{FILE_NAME as DEFAULT_FILE_NAME, QUERY_LIMIT as DEFAULT_QUERY_LIMIT};
pub use http::USER_AGENT;
