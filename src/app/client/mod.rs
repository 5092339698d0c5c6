//! HTTP client for manifest and artifact retrieval
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with status checking
//!
//! A single [`LoaderClient`] is shared by the manifest loader and both
//! transfer paths so that they reuse one connection pool.

use url::Url;

use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::HttpHandler;

/// HTTP client used by every network operation of the loader
#[derive(Debug, Clone)]
pub struct LoaderClient {
    http_handler: HttpHandler,
}

impl LoaderClient {
    /// Creates a client with the default configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` if the underlying client cannot be built
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with a custom configuration
    pub fn with_config(config: ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        tracing::debug!(
            "Created HTTP client (user agent: {}, request timeout: {:?})",
            config.user_agent,
            config.request_timeout
        );

        Ok(Self {
            http_handler: HttpHandler::new(client),
        })
    }

    /// Issues a GET request and returns the response once its status is known good
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch
    /// * `bypass_cache` - Ask intermediaries for a fresh copy
    pub async fn get(&self, url: &Url, bypass_cache: bool) -> DownloadResult<reqwest::Response> {
        self.http_handler.get_response(url, bypass_cache).await
    }

    /// Parses a URL string, mapping failures to `DownloadError::InvalidUrl`
    pub fn parse_url(url: &str) -> DownloadResult<Url> {
        Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })
    }

    /// Get a reference to the HTTP handler
    pub fn http_handler(&self) -> &HttpHandler {
        &self.http_handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_rejects_relative() {
        let result = LoaderClient::parse_url("db.sqlite.gz");
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[test]
    fn test_parse_url_accepts_absolute() {
        let url = LoaderClient::parse_url("https://example.com/manifest.json").unwrap();
        assert_eq!(url.path(), "/manifest.json");
    }

    #[test]
    fn test_client_creation() {
        assert!(LoaderClient::new().is_ok());
    }
}
