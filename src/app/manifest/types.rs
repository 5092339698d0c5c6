//! Core types for the artifact manifest
//!
//! The manifest is a small JSON document:
//!
//! ```json
//! {
//!   "version": "2024-06-01",
//!   "sources": {
//!     "brotli": { "url": "db.sqlite.br", "encoding": "br", "size": 1048576 },
//!     "gzip":   { "url": "db.sqlite.gz", "encoding": "gzip" }
//!   }
//! }
//! ```
//!
//! `sources.br` is accepted in place of `sources.brotli`. A source whose
//! `url` is empty is treated as absent.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::codec::Encoding;
use crate::app::hash::Md5Hash;
use crate::errors::{ManifestError, ManifestResult};

/// Versioned description of the available compressed representations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Opaque version tag; any change invalidates the cached artifact
    pub version: String,
    /// Compressed representations on offer
    #[serde(default)]
    pub sources: Sources,
}

/// The two source slots a manifest can fill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default, alias = "br", skip_serializing_if = "Option::is_none")]
    pub brotli: Option<SourceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gzip: Option<SourceDescriptor>,
}

/// One downloadable representation of the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Absolute URL, or relative to the manifest URL before resolution
    #[serde(default)]
    pub url: String,
    /// Declared encoding; the slot's natural encoding applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    /// Advisory decompressed size in bytes, only used for a sanity warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MD5 of the decompressed artifact, enforced when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<Md5Hash>,
}

impl SourceDescriptor {
    /// A descriptor without a URL cannot be downloaded
    pub fn is_usable(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

impl Sources {
    /// Brotli source, if listed with a URL
    pub fn brotli(&self) -> Option<&SourceDescriptor> {
        self.brotli.as_ref().filter(|s| s.is_usable())
    }

    /// Gzip source, if listed with a URL
    pub fn gzip(&self) -> Option<&SourceDescriptor> {
        self.gzip.as_ref().filter(|s| s.is_usable())
    }

    /// True when at least one source can be downloaded
    pub fn has_any(&self) -> bool {
        self.brotli().is_some() || self.gzip().is_some()
    }
}

impl Manifest {
    /// Parse a manifest document and resolve its source URLs
    ///
    /// Relative source URLs are joined onto `base`; absolute URLs are kept
    /// as they are (normalised by the URL parser).
    ///
    /// # Errors
    ///
    /// * `ManifestError::JsonParse` - The document is not a valid manifest
    /// * `ManifestError::MissingSources` - Neither slot has a usable URL
    /// * `ManifestError::InvalidSourceUrl` - A source URL cannot be resolved
    pub fn from_json(bytes: &[u8], base: &Url) -> ManifestResult<Self> {
        let mut manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        manifest.resolve_urls(base)?;
        Ok(manifest)
    }

    /// Check that the manifest names at least one usable source
    pub fn validate(&self) -> ManifestResult<()> {
        if self.sources.has_any() {
            Ok(())
        } else {
            Err(ManifestError::MissingSources)
        }
    }

    fn resolve_urls(&mut self, base: &Url) -> ManifestResult<()> {
        let slots = [
            ("brotli", self.sources.brotli.as_mut()),
            ("gzip", self.sources.gzip.as_mut()),
        ];
        for (name, slot) in slots {
            let Some(source) = slot.filter(|s| s.is_usable()) else {
                continue;
            };
            let resolved =
                base.join(source.url.trim())
                    .map_err(|e| ManifestError::InvalidSourceUrl {
                        name,
                        url: source.url.clone(),
                        error: e.to_string(),
                    })?;
            source.url = resolved.to_string();
        }
        Ok(())
    }
}
