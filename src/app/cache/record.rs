//! Persisted cache record
//!
//! The record says which manifest version and file name the durable file
//! was produced for. It is one JSON document keyed by `sqlite.version`,
//! `sqlite.file`, `sqlite.source` (itself a JSON string) and
//! `sqlite.stored_at`, replaced atomically via temp file + rename. A record
//! that cannot be parsed reads as absent.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::app::selector::ResolvedSource;
use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

/// What the durable file was produced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(rename = "sqlite.version")]
    pub version: String,
    #[serde(rename = "sqlite.file")]
    pub file_name: String,
    #[serde(rename = "sqlite.source", with = "json_string")]
    pub source: ResolvedSource,
    #[serde(rename = "sqlite.stored_at", default = "Utc::now")]
    pub stored_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(version: String, file_name: String, source: ResolvedSource) -> Self {
        Self {
            version,
            file_name,
            source,
            stored_at: Utc::now(),
        }
    }

    /// True when this record describes `file_name` at `version`
    pub fn matches(&self, version: &str, file_name: &str) -> bool {
        self.version == version && self.file_name == file_name
    }
}

/// Stores the value as a JSON-encoded string
mod json_string {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(value).map_err(S::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, T: DeserializeOwned, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        serde_json::from_str(&encoded).map_err(D::Error::custom)
    }
}

/// Persistence for the single cache record
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current record, or `None` if there is none or it is unreadable
    async fn load(&self) -> CacheResult<Option<CacheRecord>>;

    /// Replace the record
    async fn save(&self, record: &CacheRecord) -> CacheResult<()>;

    /// Delete the record; deleting a missing record succeeds
    async fn clear(&self) -> CacheResult<()>;
}

/// Record kept as a JSON file
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(files::TEMP_FILE_SUFFIX);
        PathBuf::from(name)
    }

    fn record_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Record {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self) -> CacheResult<Option<CacheRecord>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.record_error(e)),
        };

        match serde_json::from_slice(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable cache record {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &CacheRecord) -> CacheResult<()> {
        let content = serde_json::to_vec_pretty(record)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.record_error(e))?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| self.record_error(e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.record_error(e));
        }

        debug!("Wrote cache record {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.record_error(e)),
        }
    }
}

/// Process-local record store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    record: Arc<RwLock<Option<CacheRecord>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self) -> CacheResult<Option<CacheRecord>> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, record: &CacheRecord) -> CacheResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CacheError::Record {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("injected save failure"),
            });
        }
        *self.record.write().await = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        *self.record.write().await = None;
        Ok(())
    }
}
