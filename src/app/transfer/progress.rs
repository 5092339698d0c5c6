//! Transfer progress events
//!
//! Producers never block on the consumer: events go through an unbounded
//! channel and a closed receiver is ignored.

use tokio::sync::mpsc;

use crate::app::codec::Encoding;

/// Progress of one artifact transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Response headers received, body about to be consumed
    Started {
        url: String,
        encoding: Encoding,
        /// Advisory decompressed size from the manifest
        expected_size: Option<u64>,
        /// True for the streaming-to-durable path
        durable: bool,
    },
    /// Decompressed bytes produced so far
    Progress { bytes: u64 },
    /// Transfer complete
    Finished { bytes: u64 },
}

/// Sending half handed to the loader
pub type ProgressSender = mpsc::UnboundedSender<TransferEvent>;

/// Receiving half kept by the renderer
pub type ProgressReceiver = mpsc::UnboundedReceiver<TransferEvent>;

/// Create a progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Optional event sink used inside the transfer loops
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressReporter {
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn emit(&self, event: TransferEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
