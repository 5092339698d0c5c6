//! Integration tests for the loader against on-disk storage
//!
//! Every test runs a local HTTP origin with mockito and a temporary storage
//! root, and builds loaders the way a new session would.

mod common;

use common::{brotli, gzip, md5_hex, sqlite_bytes, Harness};
use serde_json::json;
use sqlite_loader::app::{run_query, Decompressors, Encoding, LoadOptions, Location, SourceKind};
use sqlite_loader::errors::{AppError, DownloadError, ManifestError, StorageError};
use tokio_util::sync::CancellationToken;

fn gzip_manifest(version: &str) -> String {
    json!({
        "version": version,
        "sources": { "gzip": { "url": "db.sqlite.gz" } }
    })
    .to_string()
}

#[tokio::test]
async fn test_stored_copy_survives_new_session() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(12).await;
    harness.serve_manifest(gzip_manifest("2024.1")).await;
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 1)
        .await;

    let first = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(first.location, Location::Durable);
    first.db.close().await.unwrap();

    // New loader, same storage root: no second download
    let second = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(second.location, Location::Durable);
    assert_eq!(second.version, "2024.1");
    assert_eq!(second.source.kind, SourceKind::Gzip);

    let output = run_query(second.db.as_ref(), "SELECT COUNT(*) AS n FROM readings", 10)
        .await
        .unwrap();
    assert_eq!(output.rows[0]["n"], json!(12));

    artifact.assert_async().await;
    assert_eq!(
        std::fs::read(harness.stored_path("db.sqlite")).unwrap(),
        database
    );
    assert!(harness.config.record_path().exists());
}

#[tokio::test]
async fn test_version_bump_downloads_again() {
    let mut harness = Harness::new().await;
    let old = sqlite_bytes(1).await;
    let new = sqlite_bytes(2).await;

    let manifest = harness.serve_manifest(gzip_manifest("v1")).await;
    let artifact = harness.serve("/data/db.sqlite.gz", gzip(&old), 1).await;
    let loader = harness.loader();
    loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    manifest.remove_async().await;
    artifact.assert_async().await;
    artifact.remove_async().await;

    harness.serve_manifest(gzip_manifest("v2")).await;
    let artifact = harness.serve("/data/db.sqlite.gz", gzip(&new), 1).await;
    let loaded = loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(loaded.version, "v2");
    let output = run_query(loaded.db.as_ref(), "SELECT id FROM readings", 10)
        .await
        .unwrap();
    assert_eq!(output.rows.len(), 2);
    artifact.assert_async().await;
}

#[tokio::test]
async fn test_brotli_source_preferred() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(3).await;
    let manifest = json!({
        "version": "b1",
        "sources": {
            "br": { "url": "db.sqlite.br", "size": database.len() },
            "gzip": { "url": "db.sqlite.gz" }
        }
    });
    harness.serve_manifest(manifest.to_string()).await;
    let br = harness
        .serve("/data/db.sqlite.br", brotli(&database).await, 1)
        .await;
    let gz = harness.serve("/data/db.sqlite.gz", gzip(&database), 0).await;

    let loaded = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(loaded.source.kind, SourceKind::Brotli);
    assert_eq!(loaded.source.encoding, Encoding::Brotli);
    br.assert_async().await;
    gz.assert_async().await;
}

#[tokio::test]
async fn test_no_brotli_streaming_uses_gzip() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(3).await;
    let manifest = json!({
        "version": "b1",
        "sources": {
            "brotli": { "url": "db.sqlite.br" },
            "gzip": { "url": "db.sqlite.gz" }
        }
    });
    harness.serve_manifest(manifest.to_string()).await;
    let br = harness
        .serve("/data/db.sqlite.br", brotli(&database).await, 0)
        .await;
    let gz = harness.serve("/data/db.sqlite.gz", gzip(&database), 1).await;

    let loaded = harness
        .loader_with(Decompressors::detect().without_streaming(Encoding::Brotli))
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(loaded.source.kind, SourceKind::Gzip);
    br.assert_async().await;
    gz.assert_async().await;
}

#[tokio::test]
async fn test_memory_only_leaves_no_trace() {
    let mut harness = Harness::new().await;
    harness.config.durable = false;
    let database = sqlite_bytes(5).await;
    harness.serve_manifest(gzip_manifest("m1")).await;
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 2)
        .await;

    for _ in 0..2 {
        let loaded = harness
            .loader()
            .load_database(&harness.manifest_url(), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(loaded.location, Location::Memory);
    }

    // Nothing is recorded, so every session downloads again
    artifact.assert_async().await;
    assert!(!harness.config.record_path().exists());
    assert!(!harness.stored_path("db.sqlite").exists());
}

#[tokio::test]
async fn test_memory_only_brotli_is_unsupported() {
    let mut harness = Harness::new().await;
    harness.config.durable = false;
    let manifest = json!({
        "version": "m1",
        "sources": { "brotli": { "url": "db.sqlite.br" } }
    });
    harness.serve_manifest(manifest.to_string()).await;
    let artifact = harness.serve("/data/db.sqlite.br", Vec::new(), 0).await;

    let result = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Download(DownloadError::UnsupportedEncoding { .. }))
    ));
    artifact.assert_async().await;
}

#[tokio::test]
async fn test_clear_then_load_downloads_again() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    harness.serve_manifest(gzip_manifest("c1")).await;
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 2)
        .await;
    let loader = harness.loader();

    loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    loader.clear_stored_database("db.sqlite").await.unwrap();

    assert!(!harness.stored_path("db.sqlite").exists());
    assert!(!harness.config.record_path().exists());

    let loaded = loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(loaded.location, Location::Durable);
    artifact.assert_async().await;
}

#[tokio::test]
async fn test_cancelled_load_is_not_recorded() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    harness.serve_manifest(gzip_manifest("x1")).await;
    harness
        .serve("/data/db.sqlite.gz", gzip(&database), 0)
        .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = harness
        .loader()
        .load_database(
            &harness.manifest_url(),
            &LoadOptions::default().with_cancel(cancel),
        )
        .await;

    let error = result.unwrap_err();
    assert!(error.is_aborted());
    assert!(!harness.config.record_path().exists());
}

#[tokio::test]
async fn test_checksum_mismatch_fails_both_paths() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    let manifest = json!({
        "version": "h1",
        "sources": { "gzip": { "url": "db.sqlite.gz", "md5": md5_hex(b"something else") } }
    });
    harness.serve_manifest(manifest.to_string()).await;
    // Streaming attempt, then the in-memory fallback
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 2)
        .await;

    let result = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Download(DownloadError::HashMismatch { .. }))
    ));
    artifact.assert_async().await;
    assert!(!harness.config.record_path().exists());
}

#[tokio::test]
async fn test_matching_checksum_is_accepted() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    let manifest = json!({
        "version": "h2",
        "sources": { "gzip": { "url": "db.sqlite.gz", "md5": md5_hex(&database) } }
    });
    harness.serve_manifest(manifest.to_string()).await;
    harness
        .serve("/data/db.sqlite.gz", gzip(&database), 1)
        .await;

    let loaded = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(loaded.location, Location::Durable);
}

#[tokio::test]
async fn test_corrupt_record_is_ignored() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    harness.serve_manifest(gzip_manifest("r1")).await;
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 2)
        .await;
    let loader = harness.loader();

    loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    std::fs::write(harness.config.record_path(), b"{ not json").unwrap();

    let loaded = loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(loaded.location, Location::Durable);
    artifact.assert_async().await;
    let record = loader.cache().record().await.unwrap().unwrap();
    assert_eq!(record.version, "r1");
}

#[tokio::test]
async fn test_manifest_errors() {
    let mut harness = Harness::new().await;
    harness.serve_manifest("not json".to_string()).await;

    let result = harness
        .loader()
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(AppError::Manifest(ManifestError::JsonParse(_)))
    ));

    let result = harness
        .loader()
        .load_database(
            &format!("{}/missing.json", harness.server.url()),
            &LoadOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Manifest(_))));
}

#[tokio::test]
async fn test_record_file_name_is_refused_for_the_database() {
    let mut harness = Harness::new().await;
    let database = sqlite_bytes(2).await;
    harness.serve_manifest(gzip_manifest("n1")).await;
    let artifact = harness
        .serve("/data/db.sqlite.gz", gzip(&database), 1)
        .await;
    let loader = harness.loader();

    loader
        .load_database(&harness.manifest_url(), &LoadOptions::default())
        .await
        .unwrap();
    let record_file = harness.config.record_file.clone();

    let result = loader
        .load_database(
            &harness.manifest_url(),
            &LoadOptions::default().with_file_name(record_file.clone()),
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::Storage(StorageError::InvalidName { .. }))
    ));
    assert!(loader.clear_stored_database(&record_file).await.is_err());

    // The record still describes the stored database
    let record = loader.cache().record().await.unwrap().unwrap();
    assert_eq!(record.file_name, "db.sqlite");
    artifact.assert_async().await;
}
