//! Process-local durable store
//!
//! Content lives in a shared map, so clones of a [`MemoryStore`] observe the
//! same files. Write and remove failures can be switched on to exercise the
//! fallback and best-effort paths of the cache manager.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_name, DurableStore, WritableSink};
use crate::errors::{StorageError, StorageResult};

type Files = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// In-memory durable store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Files,
    fail_writes: Arc<AtomicBool>,
    fail_removes: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with files
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, Vec<u8>)>) -> Self {
        let map = files
            .into_iter()
            .map(|(name, data)| (name.into(), data))
            .collect();
        Self {
            files: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent remove fail
    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of sinks closed successfully
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Snapshot of a file's content
    pub async fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(name).cloned()
    }

    fn injected_failure(name: &str, operation: &str) -> StorageError {
        StorageError::Backend(format!("injected {} failure for {}", operation, name))
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        self.files
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self.files.read().await.contains_key(name))
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        validate_name(name)?;
        self.files
            .read()
            .await
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })
    }

    async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        validate_name(name)?;
        self.contents(name).await.ok_or_else(|| StorageError::NotFound {
            name: name.to_string(),
        })
    }

    async fn writer(&self, name: &str) -> StorageResult<Box<dyn WritableSink>> {
        validate_name(name)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected_failure(name, "write"));
        }
        Ok(Box::new(MemorySink {
            name: name.to_string(),
            buffer: Vec::new(),
            store: self.clone(),
        }))
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(Self::injected_failure(name, "remove"));
        }
        self.files
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })
    }
}

struct MemorySink {
    name: String,
    buffer: Vec<u8>,
    store: MemoryStore,
}

#[async_trait]
impl WritableSink for MemorySink {
    async fn write(&mut self, chunk: &[u8]) -> StorageResult<()> {
        if self.store.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryStore::injected_failure(&self.name, "write"));
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn close(self: Box<Self>) -> StorageResult<u64> {
        let MemorySink {
            name,
            buffer,
            store,
        } = *self;
        let written = buffer.len() as u64;
        store.files.write().await.insert(name, buffer);
        store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(written)
    }
}
