//! Directory-backed durable store
//!
//! Files live directly under the root directory. A writer streams into
//! `<name>.part` and renames it over `<name>` on close, so an interrupted
//! transfer never replaces a committed file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::{validate_name, DurableStore, WritableSink};
use crate::constants::files;
use crate::errors::{StorageError, StorageResult};

/// Durable store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// Returns `None` when the directory cannot be created or written, which
    /// callers treat as "durable storage unavailable".
    pub fn open(root: impl AsRef<Path>) -> Option<Self> {
        let root = root.as_ref().to_path_buf();

        // Runs once at startup; not worth making the constructor async
        if let Err(e) = std::fs::create_dir_all(&root) {
            warn!(
                "Durable storage unavailable: cannot create {}: {}",
                root.display(),
                e
            );
            return None;
        }

        if let Err(e) = tempfile::NamedTempFile::new_in(&root) {
            warn!(
                "Durable storage unavailable: {} is not writable: {}",
                root.display(),
                e
            );
            return None;
        }

        debug!("Opened durable storage at {}", root.display());
        Some(Self { root })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn partial_path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self
            .root
            .join(format!("{}{}", name, files::PARTIAL_FILE_SUFFIX)))
    }

    fn map_io_error(e: std::io::Error, name: &str) -> StorageError {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound {
                name: name.to_string(),
            },
            _ => StorageError::Io {
                name: name.to_string(),
                source: e,
            },
        }
    }
}

#[async_trait]
impl DurableStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn create(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Self::map_io_error(e, name))?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, name)),
        }
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        let path = self.path_for(name)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| Self::map_io_error(e, name))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(metadata.len())
    }

    async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path)
            .await
            .map_err(|e| Self::map_io_error(e, name))
    }

    async fn writer(&self, name: &str) -> StorageResult<Box<dyn WritableSink>> {
        let final_path = self.path_for(name)?;
        let partial_path = self.partial_path_for(name)?;
        let file = fs::File::create(&partial_path)
            .await
            .map_err(|e| Self::map_io_error(e, name))?;

        Ok(Box::new(LocalSink {
            name: name.to_string(),
            partial_path,
            final_path,
            writer: BufWriter::new(file),
            written: 0,
        }))
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        let result = fs::remove_file(&path)
            .await
            .map_err(|e| Self::map_io_error(e, name));

        // Leftovers of an aborted transfer go too
        let partial_path = self.partial_path_for(name)?;
        if let Err(e) = fs::remove_file(&partial_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not remove {}: {}", partial_path.display(), e);
            }
        }

        result
    }
}

struct LocalSink {
    name: String,
    partial_path: PathBuf,
    final_path: PathBuf,
    writer: BufWriter<fs::File>,
    written: u64,
}

#[async_trait]
impl WritableSink for LocalSink {
    async fn write(&mut self, chunk: &[u8]) -> StorageResult<()> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.name))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> StorageResult<u64> {
        self.writer
            .flush()
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.name))?;
        self.writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.name))?;

        fs::rename(&self.partial_path, &self.final_path)
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.name))?;

        debug!(
            "Committed {} bytes to {}",
            self.written,
            self.final_path.display()
        );
        Ok(self.written)
    }
}
