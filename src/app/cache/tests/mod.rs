//! Scenario tests for the cache manager
//!
//! Each test serves fixtures from a local mockito server and counts
//! downloads with `expect(n)`, using the in-memory durable and record
//! stores so that failures can be injected.


use std::sync::Arc;

use crate::app::cache::{CacheManager, MemoryRecordStore};
use crate::app::client::LoaderClient;
use crate::app::codec::Decompressors;
use crate::app::manifest::{Manifest, SourceDescriptor, Sources};
use crate::app::store::{MemoryStore, StorageAdapter};

pub(crate) struct Fixture {
    pub server: mockito::ServerGuard,
    pub store: MemoryStore,
    pub records: MemoryRecordStore,
    pub cache: CacheManager,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with(Decompressors::detect(), true).await
    }

    pub async fn with(decompressors: Decompressors, durable: bool) -> Self {
        let server = mockito::Server::new_async().await;
        let store = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let storage = if durable {
            StorageAdapter::with_store(store.clone())
        } else {
            StorageAdapter::unavailable()
        };
        let cache = CacheManager::new(
            storage,
            Arc::new(records.clone()),
            LoaderClient::new().unwrap(),
            decompressors,
        )
        .with_chunk_size(4096);

        Self {
            server,
            store,
            records,
            cache,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    pub async fn serve(&mut self, path: &str, body: Vec<u8>, hits: usize) -> mockito::Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    pub fn manifest(&self, version: &str, brotli: Option<&str>, gzip: Option<&str>) -> Manifest {
        let descriptor = |path: &str| SourceDescriptor {
            url: self.url(path),
            encoding: None,
            size: None,
            md5: None,
        };
        Manifest {
            version: version.to_string(),
            sources: Sources {
                brotli: brotli.map(descriptor),
                gzip: gzip.map(descriptor),
            },
        }
    }
}
