//! Configuration management for the SQLite loader
//!
//! Settings come from, in increasing precedence: built-in defaults, the first
//! configuration file found, environment variables and command-line flags.
//! The last step is applied by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::store::validate_name;
use crate::app::{CacheConfig, ClientConfig, Decompressors, Encoding};
use crate::constants::{defaults, env, files, http, logging, record};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Durable storage settings
    pub storage: StorageConfigToml,
    /// Manifest and transfer settings
    pub loader: LoaderConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Total request timeout in seconds (None = no timeout)
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: None,
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            user_agent: None,
        }
    }
}

/// TOML-friendly durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfigToml {
    /// Storage directory (None = platform data directory)
    pub root: Option<PathBuf>,
    /// Use durable storage; `false` keeps every load in memory
    pub durable: bool,
    /// Cache record file name inside the storage root
    pub record_file: String,
}

impl Default for StorageConfigToml {
    fn default() -> Self {
        Self {
            root: None,
            durable: true,
            record_file: record::RECORD_FILE_NAME.to_string(),
        }
    }
}

/// TOML-friendly loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfigToml {
    /// Manifest location used when none is given on the command line
    pub manifest_url: Option<String>,
    /// Name of the database in durable storage
    pub file_name: String,
    /// Prefer the brotli source when it can be streamed
    pub prefer_brotli: bool,
    /// Encodings the streaming path must treat as unsupported
    pub disable_streaming: Vec<Encoding>,
    /// Read size of the streaming copy loop in bytes
    pub chunk_size: usize,
}

impl Default for LoaderConfigToml {
    fn default() -> Self {
        Self {
            manifest_url: None,
            file_name: defaults::FILE_NAME.to_string(),
            prefer_brotli: defaults::PREFER_BROTLI,
            disable_streaming: Vec::new(),
            chunk_size: files::DOWNLOAD_CHUNK_SIZE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// # Errors
    ///
    /// * `ConfigError::NotFound` - An explicit config file does not exist
    /// * `ConfigError::Read` / `InvalidFormat` - The file cannot be used
    /// * `ConfigError::InvalidValue` - A setting is out of range
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = value(env::MANIFEST_URL) {
            debug!("Manifest URL overridden by {}", env::MANIFEST_URL);
            self.loader.manifest_url = Some(url);
        }
        if let Some(root) = value(env::STORAGE_ROOT) {
            debug!("Storage root overridden by {}", env::STORAGE_ROOT);
            self.storage.root = Some(PathBuf::from(root));
        }
        if let Some(level) = value(env::LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> ConfigResult<()> {
        if self.loader.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "loader.chunk_size".to_string(),
                value: "0".to_string(),
                reason: "Chunk size must be at least one byte".to_string(),
            });
        }
        for (field, name) in [
            ("loader.file_name", &self.loader.file_name),
            ("storage.record_file", &self.storage.record_file),
        ] {
            if validate_name(name).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: name.clone(),
                    reason: "Expected a plain file name".to_string(),
                });
            }
        }
        if self.loader.file_name == self.storage.record_file {
            return Err(ConfigError::InvalidValue {
                field: "loader.file_name".to_string(),
                value: self.loader.file_name.clone(),
                reason: "The database cannot share a name with the cache record".to_string(),
            });
        }
        Ok(())
    }

    /// Runtime client configuration
    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }

    /// Runtime cache configuration
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            storage_root: self.storage.root.clone(),
            durable: self.storage.durable,
            record_file: self.storage.record_file.clone(),
            chunk_size: self.loader.chunk_size,
        }
    }

    /// Detected decompressors minus the encodings disabled for streaming
    pub fn decompressors(&self) -> Decompressors {
        self.loader
            .disable_streaming
            .iter()
            .fold(Decompressors::detect(), |decompressors, encoding| {
                decompressors.without_streaming(*encoding)
            })
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!("./{}.toml", defaults::APP_DIR_NAME))];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(defaults::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# SQLite Loader Configuration

[client]
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {}
pool_max_per_host = {}
connect_timeout_secs = {}
# request_timeout_secs = 600  # Unset: transfers are never timed out

[storage]
# root = "/path/to/storage"  # Unset: platform data directory
durable = true
record_file = "{}"

[loader]
# manifest_url = "https://example.com/data/manifest.json"
file_name = "{}"
prefer_brotli = {}
disable_streaming = []  # e.g. ["br"]
chunk_size = {}

[logging]
level = "{}"  # error, warn, info, debug, trace
"#,
            http::POOL_IDLE_TIMEOUT.as_secs(),
            http::POOL_MAX_PER_HOST,
            http::CONNECT_TIMEOUT.as_secs(),
            record::RECORD_FILE_NAME,
            defaults::FILE_NAME,
            defaults::PREFER_BROTLI,
            files::DOWNLOAD_CHUNK_SIZE,
            logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}
