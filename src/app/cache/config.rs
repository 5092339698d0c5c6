//! Cache configuration types and per-call load options

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::app::transfer::ProgressSender;
use crate::constants::{defaults, files, record};

/// Configuration for durable storage and the cache record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for durable storage (platform data dir if None)
    pub storage_root: Option<PathBuf>,
    /// Use durable storage at all; `false` forces the in-memory path
    pub durable: bool,
    /// Record file name, relative to the storage root
    pub record_file: String,
    /// Read size of the streaming copy loop
    pub chunk_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            durable: true,
            record_file: record::RECORD_FILE_NAME.to_string(),
            chunk_size: files::DOWNLOAD_CHUNK_SIZE,
        }
    }
}

impl CacheConfig {
    /// Configuration rooted at a custom directory
    pub fn with_storage_root(storage_root: PathBuf) -> Self {
        Self {
            storage_root: Some(storage_root),
            ..Default::default()
        }
    }

    /// Enable or disable durable storage
    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Storage root, falling back to the platform data directory
    ///
    /// - Linux: ~/.local/share/sqlite-loader
    /// - macOS: ~/Library/Application Support/sqlite-loader
    /// - Windows: %APPDATA%/sqlite-loader
    pub fn resolved_root(&self) -> PathBuf {
        self.storage_root.clone().unwrap_or_else(default_storage_root)
    }

    /// Path of the cache record file
    pub fn record_path(&self) -> PathBuf {
        self.resolved_root().join(&self.record_file)
    }
}

/// Default durable storage directory for this platform
pub fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(defaults::APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(defaults::APP_DIR_NAME))
}

/// Options for one `ensure_stored` / `load_database` call
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Prefer the brotli source when it can be streamed
    pub prefer_brotli: bool,
    /// Name of the artifact in durable storage
    pub file_name: String,
    /// Download even if a matching cached copy exists
    pub force: bool,
    /// Cancels the transfer at chunk granularity
    pub cancel: CancellationToken,
    /// Receives transfer progress events
    pub progress: Option<ProgressSender>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            prefer_brotli: defaults::PREFER_BROTLI,
            file_name: defaults::FILE_NAME.to_string(),
            force: false,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

impl LoadOptions {
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_prefer_brotli(mut self, prefer_brotli: bool) -> Self {
        self.prefer_brotli = prefer_brotli;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }
}
