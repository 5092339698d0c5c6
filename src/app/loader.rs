//! Top-level loader
//!
//! Ties the manifest fetch, the cache manager and the query engine into the
//! two operations a front end needs: load the current database, and forget
//! the stored copy.

use std::sync::Arc;

use tracing::info;

use crate::app::cache::{CacheManager, LoadOptions};
use crate::app::client::LoaderClient;
use crate::app::database::{open_database, LoadedDatabase, QueryEngine, SqliteEngine};
use crate::app::manifest::{load_manifest, Manifest};
use crate::errors::{DownloadError, Result};

/// Loads the versioned database described by a manifest
pub struct Loader {
    client: LoaderClient,
    cache: CacheManager,
    engine: Arc<dyn QueryEngine>,
}

impl Loader {
    /// Loader opening databases with the SQLite engine
    pub fn new(client: LoaderClient, cache: CacheManager) -> Self {
        Self {
            client,
            cache,
            engine: Arc::new(SqliteEngine::new()),
        }
    }

    /// Replace the query engine
    pub fn with_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn client(&self) -> &LoaderClient {
        &self.client
    }

    /// Fetch the manifest, bypassing HTTP caches
    pub async fn manifest(&self, manifest_url: &str) -> Result<Manifest> {
        Ok(load_manifest(&self.client, manifest_url).await?)
    }

    /// Fetch the manifest, make the artifact available and open it
    ///
    /// # Errors
    ///
    /// Any manifest, download or database error. `DownloadError::Aborted`
    /// is returned when `options.cancel` fires during the manifest fetch or
    /// a transfer.
    pub async fn load_database(
        &self,
        manifest_url: &str,
        options: &LoadOptions,
    ) -> Result<LoadedDatabase> {
        let manifest = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => {
                return Err(DownloadError::Aborted {
                    url: manifest_url.to_string(),
                }
                .into())
            }
            manifest = self.manifest(manifest_url) => manifest?,
        };
        let stored = self.cache.ensure_stored(&manifest, options).await?;
        let loaded = open_database(stored, self.engine.as_ref()).await?;

        info!(
            "Database {} ready at version {} from {}",
            options.file_name, loaded.version, loaded.location
        );
        Ok(loaded)
    }

    /// Remove the stored artifact and its cache record
    pub async fn clear_stored_database(&self, file_name: &str) -> Result<()> {
        Ok(self.cache.clear_stored_database(file_name).await?)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("cache", &self.cache)
            .field("engine", &self.engine.name())
            .finish()
    }
}
