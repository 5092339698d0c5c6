//! Error types for the SQLite loader
//!
//! Each component owns an error enum; [`AppError`] aggregates them for the
//! public entry points. Capability absence (no durable storage, no streaming
//! decoder for an encoding) is never represented here: it selects a fallback
//! path instead. Messages always carry the URL, status code or encoding
//! involved so that a network or environment mismatch can be diagnosed.

use std::path::PathBuf;

use thiserror::Error;

use crate::app::codec::Encoding;

/// Network transfer and decompression errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error before a response was received
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Cancellation signal fired while the transfer was in progress
    #[error("Download of {url} was aborted")]
    Aborted { url: String },

    /// No decoder is available for the encoding on the requested path
    #[error("No {path} decompression available for encoding '{encoding}'")]
    UnsupportedEncoding {
        encoding: Encoding,
        path: &'static str,
    },

    /// Reading or decoding the response body failed
    #[error("Failed to read {encoding} body from {url}")]
    Decode {
        url: String,
        encoding: Encoding,
        #[source]
        source: std::io::Error,
    },

    /// Decompressed content does not match the manifest checksum
    #[error("File hash mismatch. Expected: {expected}, got: {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Durable storage failed while writing the artifact
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),
}

/// Manifest retrieval and source selection errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Fetching the manifest document failed
    #[error("Failed to download manifest")]
    Download(#[from] DownloadError),

    /// JSON parsing error
    #[error("JSON parsing error in manifest")]
    JsonParse(#[from] serde_json::Error),

    /// Neither a brotli nor a gzip source with a URL is listed
    #[error("Manifest lists no sources (expected 'brotli' and/or 'gzip')")]
    MissingSources,

    /// A source URL could not be resolved against the manifest URL
    #[error("Invalid {name} source URL '{url}': {error}")]
    InvalidSourceUrl {
        name: &'static str,
        url: String,
        error: String,
    },

    /// No listed source can be consumed in this environment
    #[error("No usable source in manifest: {reason}")]
    NoUsableSource { reason: String },
}

/// Durable storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// File name is empty or would escape the storage root
    #[error("Invalid storage file name: '{name}'")]
    InvalidName { name: String },

    /// File does not exist in the store
    #[error("File not found in durable storage: {name}")]
    NotFound { name: String },

    /// I/O error on a stored file
    #[error("Durable storage I/O error on {name}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure
    #[error("Durable storage backend error: {0}")]
    Backend(String),
}

/// Cache record and cache manager errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache record file could not be read or written
    #[error("Cache record I/O error at {path}")]
    Record {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache record could not be serialized
    #[error("Cache record serialization failed")]
    RecordFormat(#[from] serde_json::Error),

    /// Durable storage error surfaced while managing the cache
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Database opener and query engine errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The store result does not describe readable bytes
    #[error("Invalid store for open_database: {reason}")]
    InvalidStore { reason: String },

    /// Reading the durable file failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The query engine rejected the input or the statement
    #[error("Query engine error: {message}")]
    Engine { message: String },

    /// SQLite adapter error
    #[error("SQLite error")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error while materialising the database
    #[error("Database I/O error")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(DownloadError::Http(_))
            | AppError::Download(DownloadError::Decode { .. })
            | AppError::Manifest(ManifestError::Download(DownloadError::Http(_))) => true,

            AppError::Download(DownloadError::Status { status, .. })
            | AppError::Manifest(ManifestError::Download(DownloadError::Status {
                status, ..
            })) => *status >= 500 || *status == 429,

            AppError::Download(DownloadError::Aborted { .. })
            | AppError::Download(DownloadError::UnsupportedEncoding { .. })
            | AppError::Manifest(ManifestError::NoUsableSource { .. })
            | AppError::Database(DatabaseError::InvalidStore { .. }) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(_) => "download",
            AppError::Manifest(_) => "manifest",
            AppError::Storage(_) => "storage",
            AppError::Cache(_) => "cache",
            AppError::Database(_) => "database",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// True when the error was caused by the cancellation signal
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            AppError::Download(DownloadError::Aborted { .. })
                | AppError::Manifest(ManifestError::Download(DownloadError::Aborted { .. }))
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Storage result type alias
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Database result type alias
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
