//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use futures::io::AsyncWriteExt;
use sqlite_loader::app::{CacheConfig, CacheManager, Decompressors, Loader, LoaderClient};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tempfile::TempDir;

/// Bytes of a SQLite database holding `rows` rows in `readings`
pub async fn sqlite_bytes(rows: i64) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.sqlite");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query("CREATE TABLE readings (id INTEGER PRIMARY KEY, station TEXT, value REAL)")
        .execute(&pool)
        .await
        .unwrap();
    for id in 1..=rows {
        sqlx::query("INSERT INTO readings (id, station, value) VALUES (?, ?, ?)")
            .bind(id)
            .bind(format!("station-{}", id % 3))
            .bind(id as f64 * 0.25)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    std::fs::read(&path).unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub async fn brotli(data: &[u8]) -> Vec<u8> {
    let mut encoder = async_compression::futures::write::BrotliEncoder::new(Vec::new());
    encoder.write_all(data).await.unwrap();
    encoder.close().await.unwrap();
    encoder.into_inner()
}

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Local HTTP origin plus an on-disk storage root
pub struct Harness {
    pub server: mockito::ServerGuard,
    pub dir: TempDir,
    pub config: CacheConfig,
}

impl Harness {
    pub async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::with_storage_root(dir.path().join("storage"));
        Self {
            server,
            dir,
            config,
        }
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/data/manifest.json", self.server.url())
    }

    /// A fresh loader, as a new session would build it
    pub fn loader(&self) -> Loader {
        self.loader_with(Decompressors::detect())
    }

    pub fn loader_with(&self, decompressors: Decompressors) -> Loader {
        let client = LoaderClient::new().unwrap();
        let cache = CacheManager::from_config(&self.config, client.clone(), decompressors);
        Loader::new(client, cache)
    }

    pub fn stored_path(&self, name: &str) -> PathBuf {
        self.config.resolved_root().join(name)
    }

    pub async fn serve_manifest(&mut self, body: String) -> mockito::Mock {
        self.server
            .mock("GET", "/data/manifest.json")
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn serve(&mut self, path: &str, body: Vec<u8>, hits: usize) -> mockito::Mock {
        self.server
            .mock("GET", path)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
