//! Core cache manager
//!
//! Decides whether the durable copy can be reused, drives the streaming and
//! in-memory transfers otherwise, and keeps the cache record in step with
//! the durable file. Calls for the same file name are serialised.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::app::client::LoaderClient;
use crate::app::codec::Decompressors;
use crate::app::manifest::Manifest;
use crate::app::selector::pick_source;
use crate::app::store::StorageAdapter;
use crate::app::transfer::{download_to_memory, StreamingTransfer};
use crate::errors::{CacheResult, DownloadError, Result, StorageError, StorageResult};

use super::config::{CacheConfig, LoadOptions};
use super::record::{CacheRecord, FileRecordStore, RecordStore};
use super::result::StoreResult;

/// Main cache management system
pub struct CacheManager {
    storage: StorageAdapter,
    records: Arc<dyn RecordStore>,
    client: LoaderClient,
    decompressors: Decompressors,
    streaming: StreamingTransfer,
    /// Name the record store occupies in the storage root
    record_file: Option<String>,
    /// One lock per file name
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheManager {
    /// Create a cache manager from its collaborators
    pub fn new(
        storage: StorageAdapter,
        records: Arc<dyn RecordStore>,
        client: LoaderClient,
        decompressors: Decompressors,
    ) -> Self {
        let streaming = StreamingTransfer::new(client.clone(), decompressors.clone());
        Self {
            storage,
            records,
            client,
            decompressors,
            streaming,
            record_file: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a cache manager backed by the local filesystem
    ///
    /// When `config.durable` is false, or the storage root is unusable, the
    /// manager runs without durable storage and every load is transient.
    pub fn from_config(
        config: &CacheConfig,
        client: LoaderClient,
        decompressors: Decompressors,
    ) -> Self {
        let root = config.resolved_root();
        let storage = if config.durable {
            StorageAdapter::local(&root)
        } else {
            info!("Durable storage disabled by configuration");
            StorageAdapter::unavailable()
        };
        let records = Arc::new(FileRecordStore::new(config.record_path()));

        info!(
            "Initialized cache manager with root: {} (durable: {})",
            root.display(),
            storage.is_available()
        );

        Self::new(storage, records, client, decompressors)
            .with_chunk_size(config.chunk_size)
            .with_record_file(&config.record_file)
    }

    /// Refuse `file_name` for artifacts because the record lives there
    pub fn with_record_file(mut self, file_name: &str) -> Self {
        self.record_file = Some(file_name.to_string());
        self
    }

    fn check_file_name(&self, file_name: &str) -> StorageResult<()> {
        if self.record_file.as_deref() == Some(file_name) {
            return Err(StorageError::InvalidName {
                name: file_name.to_string(),
            });
        }
        Ok(())
    }

    /// Set the read size of the streaming copy loop
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.streaming = self.streaming.with_chunk_size(chunk_size);
        self
    }

    /// Durable storage in use
    pub fn storage(&self) -> &StorageAdapter {
        &self.storage
    }

    /// Decompression capabilities in use
    pub fn decompressors(&self) -> &Decompressors {
        &self.decompressors
    }

    /// Current cache record, if any
    pub async fn record(&self) -> CacheResult<Option<CacheRecord>> {
        self.records.load().await
    }

    async fn file_lock(&self, file_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(file_name.to_string()).or_default())
    }

    /// Make the artifact described by `manifest` available
    ///
    /// 1. Select a source for the current capabilities.
    /// 2. Unless `force`, reuse the durable file when the record matches the
    ///    manifest version and file name and the file is non-empty.
    /// 3. Otherwise stream into durable storage and record the result.
    /// 4. If durable storage is unavailable or the stream fails, download
    ///    into memory without recording anything.
    ///
    /// # Errors
    ///
    /// * `StorageError::InvalidName` - `file_name` is the record file
    /// * `ManifestError::NoUsableSource` - No source fits the capabilities
    /// * `DownloadError::Aborted` - The cancellation token fired
    /// * Any error of the in-memory transfer, such as `UnsupportedEncoding`
    pub async fn ensure_stored(
        &self,
        manifest: &Manifest,
        options: &LoadOptions,
    ) -> Result<StoreResult> {
        self.check_file_name(&options.file_name)?;
        let source = pick_source(manifest, options.prefer_brotli, &self.decompressors)?;

        let lock = self.file_lock(&options.file_name).await;
        let _guard = lock.lock().await;

        if options.force {
            debug!("Forced reload of {}", options.file_name);
        } else if let Some(hit) = self.cached(manifest, &options.file_name).await {
            return Ok(hit);
        }

        // The record must never describe a file that is being rewritten
        if let Err(e) = self.records.clear().await {
            warn!("Failed to invalidate cache record: {}", e);
        }

        let durable = self
            .streaming
            .download_to_durable(
                &self.storage,
                &source,
                &options.file_name,
                &options.cancel,
                options.progress.clone(),
            )
            .await;

        match durable {
            Ok(Some(handle)) => {
                let record = CacheRecord::new(
                    manifest.version.clone(),
                    options.file_name.clone(),
                    source.clone(),
                );
                match self.records.save(&record).await {
                    Ok(()) => info!(
                        "Recorded {} at version {}",
                        options.file_name, manifest.version
                    ),
                    Err(e) => warn!(
                        "Stored {} but failed to write cache record: {}",
                        options.file_name, e
                    ),
                }
                return Ok(StoreResult::Durable {
                    handle,
                    source,
                    version: manifest.version.clone(),
                });
            }
            Ok(None) => info!("Durable storage unavailable; downloading into memory"),
            Err(e @ DownloadError::Aborted { .. }) => return Err(e.into()),
            Err(e) => warn!(
                "Streaming {} to durable storage failed: {}; falling back to in-memory download",
                source.url, e
            ),
        }

        let bytes = download_to_memory(
            &self.client,
            &self.decompressors,
            &source,
            &options.cancel,
            options.progress.clone(),
        )
        .await?;

        Ok(StoreResult::Transient {
            bytes,
            source,
            version: manifest.version.clone(),
        })
    }

    async fn cached(&self, manifest: &Manifest, file_name: &str) -> Option<StoreResult> {
        let record = match self.records.load().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No cache record");
                return None;
            }
            Err(e) => {
                warn!("Could not read cache record: {}", e);
                return None;
            }
        };

        if !record.matches(&manifest.version, file_name) {
            debug!(
                "Cache record is for {} at {}, need {} at {}",
                record.file_name, record.version, file_name, manifest.version
            );
            return None;
        }

        let existing = self.storage.open_existing(file_name).await;
        match existing.handle {
            Some(handle) if existing.exists && existing.size > 0 => {
                info!(
                    "Cache hit: {} at version {} ({} bytes)",
                    file_name, record.version, existing.size
                );
                Some(StoreResult::Durable {
                    handle,
                    source: record.source,
                    version: record.version,
                })
            }
            _ => {
                debug!("Cache record matches but {} is missing or empty", file_name);
                None
            }
        }
    }

    /// Forget the stored artifact
    ///
    /// Removal of the durable file is best-effort; the record is deleted
    /// regardless so the next load starts cold.
    ///
    /// # Errors
    ///
    /// * `CacheError::Record` - The record itself cannot be deleted
    /// * `CacheError::Storage` - `file_name` is the record file
    pub async fn clear_stored_database(&self, file_name: &str) -> CacheResult<()> {
        self.check_file_name(file_name)?;
        let lock = self.file_lock(file_name).await;
        let _guard = lock.lock().await;

        self.storage.remove_entry(file_name).await;
        self.records.clear().await?;

        info!("Cleared stored database {}", file_name);
        Ok(())
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("storage", &self.storage)
            .field("decompressors", &self.decompressors)
            .finish()
    }
}
