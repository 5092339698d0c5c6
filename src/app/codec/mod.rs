//! Decompression capabilities
//!
//! A [`Decompressors`] value describes which encodings this environment can
//! decode, separately for the streaming path (incremental, chunk at a time)
//! and the buffered path (whole payload in memory). Callers obtain decoders
//! through "try to obtain, else `None`" constructors instead of checking
//! feature flags at call sites.
//!
//! Brotli is only ever offered on the streaming path; the buffered path
//! deliberately has no brotli decoder.

mod encoding;

use std::collections::HashSet;
use std::io::Read;

use async_compression::futures::bufread::{BrotliDecoder, GzipDecoder};
use futures::io::{AsyncBufRead, AsyncRead};
use tracing::debug;

use crate::errors::{DownloadError, DownloadResult};

pub use encoding::{Encoding, UnknownEncoding};

/// Boxed streaming decoder yielding decompressed bytes
pub type BoxDecoder<'a> = Box<dyn AsyncRead + Send + Unpin + 'a>;

/// Set of encodings decodable on each transfer path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressors {
    streaming: HashSet<Encoding>,
    buffered: HashSet<Encoding>,
}

impl Default for Decompressors {
    fn default() -> Self {
        Self::detect()
    }
}

impl Decompressors {
    /// Everything this build can decode
    pub fn detect() -> Self {
        Self {
            streaming: [Encoding::Identity, Encoding::Gzip, Encoding::Brotli]
                .into_iter()
                .collect(),
            buffered: [Encoding::Identity, Encoding::Gzip].into_iter().collect(),
        }
    }

    /// Treat `encoding` as unsupported by the streaming path
    ///
    /// Identity never needs a decoder and cannot be disabled.
    pub fn without_streaming(mut self, encoding: Encoding) -> Self {
        if encoding != Encoding::Identity {
            self.streaming.remove(&encoding);
        }
        self
    }

    /// Treat `encoding` as unsupported by the buffered path
    pub fn without_buffered(mut self, encoding: Encoding) -> Self {
        if encoding != Encoding::Identity {
            self.buffered.remove(&encoding);
        }
        self
    }

    /// Wrap `reader` in a streaming decoder for `encoding`, if available
    pub fn streaming_decoder<'a, R>(&self, encoding: Encoding, reader: R) -> Option<BoxDecoder<'a>>
    where
        R: AsyncBufRead + Send + Unpin + 'a,
    {
        if !self.streaming.contains(&encoding) {
            return None;
        }
        Some(match encoding {
            Encoding::Identity => Box::new(reader),
            Encoding::Gzip => Box::new(GzipDecoder::new(reader)),
            Encoding::Brotli => Box::new(BrotliDecoder::new(reader)),
        })
    }

    /// Probe streaming support by instantiating a decoder over empty input
    ///
    /// Never fails: any inability to build the decoder reads as `false`.
    pub fn supports_streaming(&self, encoding: Encoding) -> bool {
        let supported = self
            .streaming_decoder(encoding, futures::io::empty())
            .is_some();
        debug!("Streaming decompression for '{}': {}", encoding, supported);
        supported
    }

    /// True when the buffered path can decode `encoding`
    pub fn supports_buffered(&self, encoding: Encoding) -> bool {
        self.buffered.contains(&encoding)
    }

    /// Decode a complete payload held in memory
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::UnsupportedEncoding` when the buffered path has
    /// no decoder for `encoding` (always the case for brotli), and
    /// `DownloadError::Decode` when the payload is corrupt.
    pub fn decode_buffered(
        &self,
        encoding: Encoding,
        bytes: Vec<u8>,
        url: &str,
    ) -> DownloadResult<Vec<u8>> {
        if !self.supports_buffered(encoding) {
            return Err(DownloadError::UnsupportedEncoding {
                encoding,
                path: "in-memory",
            });
        }
        match encoding {
            Encoding::Identity => Ok(bytes),
            Encoding::Gzip => {
                let mut decoded = Vec::with_capacity(bytes.len().saturating_mul(3));
                flate2::read::GzDecoder::new(bytes.as_slice())
                    .read_to_end(&mut decoded)
                    .map_err(|source| DownloadError::Decode {
                        url: url.to_string(),
                        encoding,
                        source,
                    })?;
                Ok(decoded)
            }
            Encoding::Brotli => Err(DownloadError::UnsupportedEncoding {
                encoding,
                path: "in-memory",
            }),
        }
    }
}
