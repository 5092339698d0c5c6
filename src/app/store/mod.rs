//! Durable storage capability
//!
//! Durable storage is a flat name → bytes namespace that survives process
//! restarts. It may be missing entirely (read-only media, sandboxed runs,
//! `storage.durable = false`), in which case [`StorageAdapter`] holds no
//! backend and every lookup answers `None` instead of failing.
//!
//! # Module Organization
//!
//! - [`local`] - Directory-backed store with commit-on-close writes
//! - [`memory`] - Process-local store with failure injection for tests
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlite_loader::app::store::StorageAdapter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = StorageAdapter::local("/var/lib/sqlite-loader");
//! let existing = storage.open_existing("db.sqlite").await;
//! if existing.exists {
//!     println!("{} bytes already stored", existing.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod local;
pub mod memory;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{StorageError, StorageResult};

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Backend operations on the durable namespace
///
/// All names are flat file names; implementations must reject anything that
/// could escape their root.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Backend name, used for logging only
    fn name(&self) -> &str;

    /// Ensure `name` exists, creating it empty when missing
    ///
    /// Existing content is left untouched.
    async fn create(&self, name: &str) -> StorageResult<()>;

    /// Check whether a committed file exists
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Size of a committed file
    ///
    /// Returns `StorageError::NotFound` if the file does not exist.
    async fn size(&self, name: &str) -> StorageResult<u64>;

    /// Read a committed file in full
    async fn read(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Open a sink that replaces the content of `name` when closed
    ///
    /// Bytes written to the sink are not visible under `name` until
    /// [`WritableSink::close`] succeeds. Dropping a sink without closing it
    /// leaves the previous content in place.
    async fn writer(&self, name: &str) -> StorageResult<Box<dyn WritableSink>>;

    /// Delete a file
    ///
    /// Returns `StorageError::NotFound` if the file does not exist.
    async fn remove(&self, name: &str) -> StorageResult<()>;
}

/// Write half of a durable file
#[async_trait]
pub trait WritableSink: Send {
    /// Append a chunk
    async fn write(&mut self, chunk: &[u8]) -> StorageResult<()>;

    /// Commit the written bytes and return how many there were
    async fn close(self: Box<Self>) -> StorageResult<u64>;
}

/// Shared reference to a durable backend
pub type BackendHandle = Arc<dyn DurableStore>;

/// Capability naming one file in durable storage
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    store: BackendHandle,
}

impl FileHandle {
    fn new(name: &str, store: BackendHandle) -> Self {
        Self {
            name: name.to_string(),
            store,
        }
    }

    /// File name within the durable namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current committed size
    pub async fn size(&self) -> StorageResult<u64> {
        self.store.size(&self.name).await
    }

    /// Read the committed content in full
    pub async fn read(&self) -> StorageResult<Vec<u8>> {
        self.store.read(&self.name).await
    }

    /// Open a write sink on this file
    pub async fn create_writable(&self) -> StorageResult<Box<dyn WritableSink>> {
        self.store.writer(&self.name).await
    }

    /// True when both handles name the same file in the same backend
    pub fn same_file(&self, other: &FileHandle) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.name == other.name
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("store", &self.store.name())
            .finish()
    }
}

/// Outcome of probing for a previously stored file
#[derive(Debug, Clone)]
pub struct ExistingFile {
    pub exists: bool,
    pub size: u64,
    pub handle: Option<FileHandle>,
}

impl ExistingFile {
    fn missing() -> Self {
        Self {
            exists: false,
            size: 0,
            handle: None,
        }
    }
}

/// Entry point to durable storage that tolerates its absence
#[derive(Clone, Default)]
pub struct StorageAdapter {
    backend: Option<BackendHandle>,
}

impl StorageAdapter {
    /// Wrap an optional backend
    pub fn new(backend: Option<BackendHandle>) -> Self {
        Self { backend }
    }

    /// Adapter for an environment without durable storage
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// Directory-backed storage, or unavailable if `root` is unusable
    pub fn local(root: impl AsRef<Path>) -> Self {
        Self::new(LocalStore::open(root).map(|store| Arc::new(store) as BackendHandle))
    }

    /// Wrap any backend
    pub fn with_store(store: impl DurableStore + 'static) -> Self {
        Self::new(Some(Arc::new(store)))
    }

    /// True when a backend is present
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Backend name, if any
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// Obtain a handle on `name`
    ///
    /// Returns `Ok(None)` when durable storage is unavailable. With `create`
    /// the file is created empty if missing; without it a missing file is
    /// `StorageError::NotFound`.
    pub async fn get_file_handle(
        &self,
        name: &str,
        create: bool,
    ) -> StorageResult<Option<FileHandle>> {
        let Some(backend) = &self.backend else {
            debug!("Durable storage unavailable, no handle for {}", name);
            return Ok(None);
        };

        if create {
            backend.create(name).await?;
        } else if !backend.exists(name).await? {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }

        Ok(Some(FileHandle::new(name, Arc::clone(backend))))
    }

    /// Probe a previously stored file
    ///
    /// Any failure to open or stat the file reads as `exists = false`.
    pub async fn open_existing(&self, name: &str) -> ExistingFile {
        let handle = match self.get_file_handle(name, false).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ExistingFile::missing(),
            Err(e) => {
                debug!("No existing durable file {}: {}", name, e);
                return ExistingFile::missing();
            }
        };

        match handle.size().await {
            Ok(size) => ExistingFile {
                exists: true,
                size,
                handle: Some(handle),
            },
            Err(e) => {
                debug!("Could not stat durable file {}: {}", name, e);
                ExistingFile::missing()
            }
        }
    }

    /// Remove `name`, logging instead of failing
    ///
    /// Missing storage or a missing file is not worth a warning.
    pub async fn remove_entry(&self, name: &str) {
        let Some(backend) = &self.backend else {
            return;
        };

        match backend.remove(name).await {
            Ok(()) => debug!("Removed durable file {}", name),
            Err(StorageError::NotFound { .. }) => debug!("Durable file {} already absent", name),
            Err(e) => warn!("Failed to remove durable file {}: {}", name, e),
        }
    }
}

impl fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("backend", &self.backend_name())
            .finish()
    }
}

/// Reject names that are empty or could escape a flat namespace
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.trim() != name;
    if invalid {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
