//! In-memory fallback transfer
//!
//! The whole body is downloaded, then decoded as a single buffer. Only the
//! buffered decoders apply here: identity passes through, gzip needs the
//! whole-buffer gzip decoder and brotli is always refused.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::progress::{ProgressReporter, ProgressSender, TransferEvent};
use super::{check_advisory_size, verify_checksum};
use crate::app::client::LoaderClient;
use crate::app::codec::Decompressors;
use crate::app::hash::Md5Hash;
use crate::app::selector::ResolvedSource;
use crate::errors::{DownloadError, DownloadResult};

/// Download `source` and decode it in memory
///
/// The cancellation token is raced against the request as a whole. The
/// encoding is checked before the request is sent, so an unsupported
/// encoding costs no transfer.
///
/// # Errors
///
/// * `DownloadError::UnsupportedEncoding` - No buffered decoder for the encoding
/// * `DownloadError::Status` / `Http` - The request failed
/// * `DownloadError::Decode` - The payload could not be decoded
/// * `DownloadError::Aborted` - `cancel` fired before the body was received
/// * `DownloadError::HashMismatch` - The decoded bytes fail the manifest checksum
pub async fn download_to_memory(
    client: &LoaderClient,
    decompressors: &Decompressors,
    source: &ResolvedSource,
    cancel: &CancellationToken,
    progress: Option<ProgressSender>,
) -> DownloadResult<Vec<u8>> {
    if !decompressors.supports_buffered(source.encoding) {
        return Err(DownloadError::UnsupportedEncoding {
            encoding: source.encoding,
            path: "in-memory",
        });
    }

    let url = LoaderClient::parse_url(&source.url)?;
    let reporter = ProgressReporter::new(progress);

    let fetch = async {
        let response = client.get(&url, false).await?;
        reporter.emit(TransferEvent::Started {
            url: source.url.clone(),
            encoding: source.encoding,
            expected_size: source.size,
            durable: false,
        });
        response.bytes().await.map_err(DownloadError::Http)
    };

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(DownloadError::Aborted {
                url: source.url.clone(),
            })
        }
        body = fetch => body?,
    };

    info!(
        "Downloaded {} bytes from {} into memory",
        body.len(),
        source.url
    );

    let decoders = decompressors.clone();
    let encoding = source.encoding;
    let source_url = source.url.clone();
    let (bytes, digest) = tokio::task::spawn_blocking(move || {
        let bytes = decoders.decode_buffered(encoding, Vec::from(body), &source_url)?;
        let digest = Md5Hash::compute(&bytes);
        Ok::<_, DownloadError>((bytes, digest))
    })
    .await
    .map_err(|e| DownloadError::Io(std::io::Error::other(e)))??;

    verify_checksum(source, digest)?;
    check_advisory_size(source, bytes.len() as u64);
    reporter.emit(TransferEvent::Finished {
        bytes: bytes.len() as u64,
    });

    Ok(bytes)
}
