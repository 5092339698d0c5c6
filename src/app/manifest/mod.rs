//! Manifest retrieval
//!
//! The manifest is fetched fresh on every load attempt and never cached
//! itself: intermediaries are asked for a fresh copy and a non-success
//! status surfaces as `DownloadError::Status` with the URL and code.
//!
//! # Module Organization
//!
//! - [`types`] - Manifest, Sources and SourceDescriptor
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlite_loader::app::client::LoaderClient;
//! use sqlite_loader::app::manifest::load_manifest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LoaderClient::new()?;
//! let manifest = load_manifest(&client, "https://example.com/manifest.json").await?;
//! println!("Artifact version {}", manifest.version);
//! # Ok(())
//! # }
//! ```

pub mod types;

use tracing::{debug, info};

use crate::app::client::LoaderClient;
use crate::errors::{DownloadError, ManifestResult};

pub use types::{Manifest, SourceDescriptor, Sources};

/// Fetch and parse the manifest at `url`
///
/// No retry is attempted; the caller decides what to do with a failure.
///
/// # Errors
///
/// * `DownloadError::InvalidUrl` / `Http` / `Status` wrapped in `ManifestError::Download`
/// * `ManifestError::JsonParse` if the body is not a manifest
/// * `ManifestError::MissingSources` if no source has a URL
pub async fn load_manifest(client: &LoaderClient, url: &str) -> ManifestResult<Manifest> {
    let manifest_url = LoaderClient::parse_url(url)?;
    debug!("Fetching manifest from {}", manifest_url);

    let response = client.get(&manifest_url, true).await?;
    let body = response.bytes().await.map_err(DownloadError::Http)?;

    let manifest = Manifest::from_json(&body, &manifest_url)?;
    info!(
        "Loaded manifest version {} (brotli: {}, gzip: {})",
        manifest.version,
        manifest.sources.brotli().is_some(),
        manifest.sources.gzip().is_some()
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ManifestError;

    #[tokio::test]
    async fn test_load_manifest_resolves_relative_urls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/manifest.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version": "7", "sources": {"gzip": {"url": "db.sqlite.gz"}}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = LoaderClient::new().unwrap();
        let url = format!("{}/data/manifest.json", server.url());
        let manifest = load_manifest(&client, &url).await.unwrap();

        assert_eq!(manifest.version, "7");
        assert_eq!(
            manifest.sources.gzip().unwrap().url,
            format!("{}/data/db.sqlite.gz", server.url())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_load_manifest_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/manifest.json")
            .with_status(503)
            .create_async()
            .await;

        let client = LoaderClient::new().unwrap();
        let url = format!("{}/manifest.json", server.url());
        let result = load_manifest(&client, &url).await;

        match result {
            Err(ManifestError::Download(DownloadError::Status { status, url: failed })) => {
                assert_eq!(status, 503);
                assert_eq!(failed, url);
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_manifest_rejects_invalid_url() {
        let client = LoaderClient::new().unwrap();
        let result = load_manifest(&client, "not a url").await;
        assert!(matches!(
            result,
            Err(ManifestError::Download(DownloadError::InvalidUrl { .. }))
        ));
    }
}
