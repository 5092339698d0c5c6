//! Fixtures shared by unit tests

use std::io::Write;

use futures::io::AsyncWriteExt;

use crate::app::codec::Encoding;
use crate::app::selector::{ResolvedSource, SourceKind};

/// Deterministic artifact bytes with a SQLite-like header
pub fn artifact(len: usize) -> Vec<u8> {
    let mut data = b"SQLite format 3\0".to_vec();
    data.extend((0..len.saturating_sub(data.len())).map(|i| (i % 251) as u8));
    data.truncate(len);
    data
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

pub fn source(kind: SourceKind, url: String, encoding: Encoding) -> ResolvedSource {
    ResolvedSource {
        kind,
        url,
        encoding,
        size: None,
        md5: None,
    }
}

/// Bytes of a small SQLite database with an `items` table of `rows` rows
pub async fn sqlite_database(rows: i64) -> Vec<u8> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    let dir = tempfile::tempdir().unwrap();
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

    sqlx::query(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, payload BLOB, note TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    for id in 1..=rows {
        sqlx::query("INSERT INTO items (id, name, score, payload) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(format!("item {id}"))
            .bind(id as f64 + 0.5)
            .bind(vec![0u8, 1, 2, 3])
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    std::fs::read(&path).unwrap()
}
