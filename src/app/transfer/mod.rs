//! Artifact transfer paths
//!
//! Two ways of turning a [`ResolvedSource`] into decompressed bytes:
//!
//! - [`streaming`] - pipes the response body through a streaming decoder
//!   into a durable file, one chunk at a time, without holding the payload
//!   in memory
//! - [`memory`] - downloads the whole body and decodes it as one buffer;
//!   used when durable storage or streaming is unavailable or failed
//!
//! Both honor a [`CancellationToken`](tokio_util::sync::CancellationToken),
//! warn (never fail) when the advisory size is off, and enforce the
//! manifest checksum when one is given.

pub mod memory;
pub mod progress;
pub mod streaming;

use tracing::warn;

use crate::app::hash::Md5Hash;
use crate::app::selector::ResolvedSource;
use crate::errors::{DownloadError, DownloadResult};

pub use memory::download_to_memory;
pub use progress::{progress_channel, ProgressReceiver, ProgressSender, TransferEvent};
pub use streaming::StreamingTransfer;

/// Warn when the produced byte count disagrees with the advisory size
pub(crate) fn check_advisory_size(source: &ResolvedSource, actual: u64) {
    if let Some(expected) = source.size {
        if expected != actual {
            warn!(
                "Size mismatch for {}: manifest says {} bytes, got {}",
                source.url, expected, actual
            );
        }
    }
}

/// Enforce the manifest checksum, if any
pub(crate) fn verify_checksum(source: &ResolvedSource, actual: Md5Hash) -> DownloadResult<()> {
    match source.md5 {
        Some(expected) if expected != actual => Err(DownloadError::HashMismatch {
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        }),
        _ => Ok(()),
    }
}
