//! Core HTTP operations
//!
//! Requests are issued once; there is no retry or backoff at this layer.
//! A non-success status is turned into `DownloadError::Status` so every
//! caller reports the URL and code the same way.

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Response};
use url::Url;

use crate::constants::http;
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL and checks the response status
    ///
    /// When `bypass_cache` is set, the request asks intermediaries not to
    /// serve a cached copy.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` if the request cannot be sent and
    /// `DownloadError::Status` if the server answers with a non-success code.
    pub async fn get_response(&self, url: &Url, bypass_cache: bool) -> DownloadResult<Response> {
        let mut request = self.client.get(url.as_str());
        if bypass_cache {
            request = request
                .header(CACHE_CONTROL, http::NO_CACHE)
                .header(PRAGMA, http::NO_CACHE);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("GET {} returned HTTP {}", url, status.as_u16());
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!("GET {} -> {}", url, status);
        Ok(response)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
