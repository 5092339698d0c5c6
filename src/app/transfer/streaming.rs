//! Streaming transfer into durable storage
//!
//! The response body is adapted into an `AsyncBufRead`, wrapped in the
//! decoder for the source's encoding and copied into a durable sink one
//! chunk at a time. The cancellation token is checked between chunks; an
//! aborted transfer drops its sink uncommitted.

use futures::io::AsyncReadExt;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::progress::{ProgressReporter, ProgressSender, TransferEvent};
use super::{check_advisory_size, verify_checksum};
use crate::app::client::LoaderClient;
use crate::app::codec::Decompressors;
use crate::app::hash::Md5Hasher;
use crate::app::selector::ResolvedSource;
use crate::app::store::{FileHandle, StorageAdapter};
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Streams sources into durable files
#[derive(Debug, Clone)]
pub struct StreamingTransfer {
    client: LoaderClient,
    decompressors: Decompressors,
    chunk_size: usize,
}

impl StreamingTransfer {
    pub fn new(client: LoaderClient, decompressors: Decompressors) -> Self {
        Self {
            client,
            decompressors,
            chunk_size: files::DOWNLOAD_CHUNK_SIZE,
        }
    }

    /// Set the read size of the copy loop
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Download `source` into the durable file `file_name`
    ///
    /// Returns `Ok(None)` without touching the network when durable storage
    /// is unavailable. A byte count that differs from the advisory size is
    /// only logged.
    ///
    /// # Errors
    ///
    /// * `DownloadError::UnsupportedEncoding` - No streaming decoder for the encoding
    /// * `DownloadError::Status` / `Http` - The request failed
    /// * `DownloadError::Decode` - The body could not be read or decoded
    /// * `DownloadError::Aborted` - `cancel` fired before the sink was committed
    /// * `DownloadError::HashMismatch` - The decoded bytes fail the manifest checksum
    /// * `DownloadError::Storage` - The durable sink failed
    pub async fn download_to_durable(
        &self,
        storage: &StorageAdapter,
        source: &ResolvedSource,
        file_name: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> DownloadResult<Option<FileHandle>> {
        let Some(handle) = storage.get_file_handle(file_name, true).await? else {
            debug!("No durable storage; skipping streaming transfer");
            return Ok(None);
        };

        if !self.decompressors.supports_streaming(source.encoding) {
            return Err(DownloadError::UnsupportedEncoding {
                encoding: source.encoding,
                path: "streaming",
            });
        }

        let url = LoaderClient::parse_url(&source.url)?;
        let aborted = || DownloadError::Aborted {
            url: source.url.clone(),
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(aborted()),
            response = self.client.get(&url, false) => response?,
        };

        let mut sink = handle.create_writable().await?;
        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed()
            .into_async_read();
        let mut decoder = self
            .decompressors
            .streaming_decoder(source.encoding, body)
            .ok_or(DownloadError::UnsupportedEncoding {
                encoding: source.encoding,
                path: "streaming",
            })?;

        let reporter = ProgressReporter::new(progress);
        reporter.emit(TransferEvent::Started {
            url: source.url.clone(),
            encoding: source.encoding,
            expected_size: source.size,
            durable: true,
        });
        info!(
            "Streaming {} ({}) into durable file {}",
            source.url,
            source.encoding,
            handle.name()
        );

        let mut buffer = vec![0u8; self.chunk_size];
        let mut hasher = Md5Hasher::new();
        let mut written = 0u64;
        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(aborted()),
                read = decoder.read(&mut buffer) => read.map_err(|e| DownloadError::Decode {
                    url: source.url.clone(),
                    encoding: source.encoding,
                    source: e,
                })?,
            };
            if read == 0 {
                break;
            }
            if cancel.is_cancelled() {
                return Err(aborted());
            }

            let chunk = &buffer[..read];
            sink.write(chunk).await?;
            hasher.update(chunk);
            written += read as u64;
            reporter.emit(TransferEvent::Progress { bytes: written });
        }

        // Checked before commit so a bad artifact never replaces a good one
        verify_checksum(source, hasher.finish())?;

        let committed = sink.close().await?;
        check_advisory_size(source, committed);
        reporter.emit(TransferEvent::Finished { bytes: committed });
        info!("Stored {} bytes in durable file {}", committed, handle.name());

        Ok(Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::codec::Encoding;
    use crate::app::hash::Md5Hash;
    use crate::app::selector::SourceKind;
    use crate::app::store::{DurableStore, MemoryStore, WritableSink};
    use crate::app::test_support::{artifact, brotli, gzip, source};
    use crate::app::transfer::progress_channel;
    use crate::errors::StorageResult;
    use async_trait::async_trait;

    fn transfer() -> StreamingTransfer {
        StreamingTransfer::new(LoaderClient::new().unwrap(), Decompressors::detect())
            .with_chunk_size(1024)
    }

    async fn serve(server: &mut mockito::ServerGuard, path: &str, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_streams_gzip_into_store() {
        let data = artifact(50_000);
        let mut server = mockito::Server::new_async().await;
        let mock = serve(&mut server, "/db.gz", gzip(&data)).await;

        let store = MemoryStore::new();
        let storage = StorageAdapter::with_store(store.clone());
        let mut src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );
        src.size = Some(data.len() as u64);
        src.md5 = Some(Md5Hash::compute(&data));

        let handle = transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &CancellationToken::new(), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(handle.name(), "db.sqlite");
        assert_eq!(store.contents("db.sqlite").await.unwrap(), data);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_streams_brotli_with_progress() {
        let data = artifact(20_000);
        let mut server = mockito::Server::new_async().await;
        let mock = serve(&mut server, "/db.br", brotli(&data).await).await;

        let store = MemoryStore::new();
        let storage = StorageAdapter::with_store(store.clone());
        let src = source(
            SourceKind::Brotli,
            format!("{}/db.br", server.url()),
            Encoding::Brotli,
        );
        let (tx, mut rx) = progress_channel();

        transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &CancellationToken::new(), Some(tx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.contents("db.sqlite").await.unwrap(), data);
        assert!(matches!(
            rx.recv().await,
            Some(TransferEvent::Started { durable: true, .. })
        ));
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(TransferEvent::Finished { bytes: 20_000 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unavailable_storage_returns_none_without_fetching() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/db.gz").expect(0).create_async().await;

        let src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );
        let result = transfer()
            .download_to_durable(
                &StorageAdapter::unavailable(),
                &src,
                "db.sqlite",
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsupported_streaming_encoding() {
        let transfer = StreamingTransfer::new(
            LoaderClient::new().unwrap(),
            Decompressors::detect().without_streaming(Encoding::Brotli),
        );
        let storage = StorageAdapter::with_store(MemoryStore::new());
        let src = source(
            SourceKind::Brotli,
            "http://127.0.0.1:9/db.br".to_string(),
            Encoding::Brotli,
        );

        let result = transfer
            .download_to_durable(&storage, &src, "db.sqlite", &CancellationToken::new(), None)
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::UnsupportedEncoding {
                encoding: Encoding::Brotli,
                path: "streaming"
            })
        ));
    }

    #[tokio::test]
    async fn test_status_error_commits_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/db.gz")
            .with_status(404)
            .create_async()
            .await;

        let store = MemoryStore::new();
        let storage = StorageAdapter::with_store(store.clone());
        let src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );

        let result = transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &CancellationToken::new(), None)
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::Status { status: 404, .. })
        ));
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_commits_nothing() {
        let data = artifact(4_000);
        let mut server = mockito::Server::new_async().await;
        serve(&mut server, "/db.gz", gzip(&data)).await;

        let store = MemoryStore::new();
        let storage = StorageAdapter::with_store(store.clone());
        let mut src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );
        src.md5 = Some(Md5Hash::compute(b"something else"));

        let result = transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &CancellationToken::new(), None)
            .await;
        assert!(matches!(result, Err(DownloadError::HashMismatch { .. })));
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_aborts_before_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/db.gz").expect(0).create_async().await;

        let storage = StorageAdapter::with_store(MemoryStore::new());
        let src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &cancel, None)
            .await;
        assert!(matches!(result, Err(DownloadError::Aborted { .. })));
        mock.assert_async().await;
    }

    /// Store whose sinks fire the token after the first chunk
    struct CancelOnWrite {
        inner: MemoryStore,
        cancel: CancellationToken,
    }

    struct CancellingSink {
        inner: Box<dyn WritableSink>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl WritableSink for CancellingSink {
        async fn write(&mut self, chunk: &[u8]) -> StorageResult<()> {
            self.inner.write(chunk).await?;
            self.cancel.cancel();
            Ok(())
        }

        async fn close(self: Box<Self>) -> StorageResult<u64> {
            let sink = *self;
            sink.inner.close().await
        }
    }

    #[async_trait]
    impl DurableStore for CancelOnWrite {
        fn name(&self) -> &str {
            "cancel-on-write"
        }
        async fn create(&self, name: &str) -> StorageResult<()> {
            self.inner.create(name).await
        }
        async fn exists(&self, name: &str) -> StorageResult<bool> {
            self.inner.exists(name).await
        }
        async fn size(&self, name: &str) -> StorageResult<u64> {
            self.inner.size(name).await
        }
        async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
            self.inner.read(name).await
        }
        async fn writer(&self, name: &str) -> StorageResult<Box<dyn WritableSink>> {
            Ok(Box::new(CancellingSink {
                inner: self.inner.writer(name).await?,
                cancel: self.cancel.clone(),
            }))
        }
        async fn remove(&self, name: &str) -> StorageResult<()> {
            self.inner.remove(name).await
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_leaves_file_uncommitted() {
        let data = artifact(100_000);
        let mut server = mockito::Server::new_async().await;
        serve(&mut server, "/db.gz", gzip(&data)).await;

        let cancel = CancellationToken::new();
        let inner = MemoryStore::new();
        let storage = StorageAdapter::with_store(CancelOnWrite {
            inner: inner.clone(),
            cancel: cancel.clone(),
        });
        let src = source(
            SourceKind::Gzip,
            format!("{}/db.gz", server.url()),
            Encoding::Gzip,
        );

        let result = transfer()
            .download_to_durable(&storage, &src, "db.sqlite", &cancel, None)
            .await;

        match result {
            Err(DownloadError::Aborted { url }) => assert_eq!(url, src.url),
            other => panic!("Expected Aborted, got {:?}", other),
        }
        assert_eq!(inner.commits(), 0);
        assert_eq!(inner.contents("db.sqlite").await, Some(Vec::new()));
    }
}
