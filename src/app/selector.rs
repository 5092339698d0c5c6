//! Source selection under capability constraints
//!
//! Brotli is chosen only when the caller asks for it and the streaming
//! probe can instantiate a decoder for the slot's encoding. Gzip is the
//! universal fallback because it can be consumed on both transfer paths.
//! Brotli is never handed to the in-memory path, so an unsupported brotli
//! source with no gzip alternative is a `NoUsableSource` error.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::codec::{Decompressors, Encoding};
use crate::app::hash::Md5Hash;
use crate::app::manifest::{Manifest, SourceDescriptor};
use crate::errors::{ManifestError, ManifestResult};

const BROTLI_UNSUPPORTED: &str =
    "brotli source requires streaming decompression support; list a gzip source in the manifest";

/// Which manifest slot a source came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Brotli,
    Gzip,
}

impl SourceKind {
    /// Encoding assumed when the manifest omits one
    pub fn default_encoding(&self) -> Encoding {
        match self {
            SourceKind::Brotli => Encoding::Brotli,
            SourceKind::Gzip => Encoding::Gzip,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Brotli => f.write_str("brotli"),
            SourceKind::Gzip => f.write_str("gzip"),
        }
    }
}

/// A concrete source with its effective encoding filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    pub url: String,
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<Md5Hash>,
}

impl ResolvedSource {
    fn from_descriptor(kind: SourceKind, descriptor: &SourceDescriptor) -> Self {
        Self {
            kind,
            url: descriptor.url.clone(),
            encoding: descriptor
                .encoding
                .unwrap_or_else(|| kind.default_encoding()),
            size: descriptor.size,
            md5: descriptor.md5,
        }
    }
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.kind, self.encoding, self.url)
    }
}

/// Pick one source from the manifest
///
/// 1. With `prefer_brotli` and a brotli source: use it if its encoding can
///    be streamed, else gzip if present, else fail.
/// 2. Otherwise gzip if present.
/// 3. Otherwise brotli if it can be streamed.
/// 4. Otherwise fail.
///
/// # Errors
///
/// Returns `ManifestError::NoUsableSource` when no listed source can be
/// consumed with the given decompressors.
pub fn pick_source(
    manifest: &Manifest,
    prefer_brotli: bool,
    decompressors: &Decompressors,
) -> ManifestResult<ResolvedSource> {
    let brotli = manifest
        .sources
        .brotli()
        .map(|d| ResolvedSource::from_descriptor(SourceKind::Brotli, d));
    let gzip = manifest
        .sources
        .gzip()
        .map(|d| ResolvedSource::from_descriptor(SourceKind::Gzip, d));

    if prefer_brotli {
        if let Some(brotli) = brotli {
            if decompressors.supports_streaming(brotli.encoding) {
                debug!("Selected brotli source {}", brotli.url);
                return Ok(brotli);
            }
            return match gzip {
                Some(gzip) => {
                    debug!(
                        "Brotli encoding '{}' cannot be streamed, falling back to gzip",
                        brotli.encoding
                    );
                    Ok(gzip)
                }
                None => Err(ManifestError::NoUsableSource {
                    reason: BROTLI_UNSUPPORTED.to_string(),
                }),
            };
        }
    }

    if let Some(gzip) = gzip {
        debug!("Selected gzip source {}", gzip.url);
        return Ok(gzip);
    }

    match brotli {
        Some(brotli) if decompressors.supports_streaming(brotli.encoding) => {
            debug!("Selected brotli source {} (no gzip listed)", brotli.url);
            Ok(brotli)
        }
        Some(_) => Err(ManifestError::NoUsableSource {
            reason: BROTLI_UNSUPPORTED.to_string(),
        }),
        None => Err(ManifestError::NoUsableSource {
            reason: "manifest lists no source with a URL".to_string(),
        }),
    }
}
