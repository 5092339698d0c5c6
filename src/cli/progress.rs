//! Transfer progress display
//!
//! Renders [`TransferEvent`]s from the loader with an indicatif bar when
//! stderr is a terminal, and as a couple of plain lines otherwise.

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::transfer::{progress_channel, ProgressReceiver, ProgressSender, TransferEvent};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {bytes_per_sec}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} {bytes_per_sec} {msg}";

/// Progress display for a single load
pub struct ProgressDisplay {
    sender: Option<ProgressSender>,
    task: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Start rendering; a disabled display hands out no sender
    pub fn start(enabled: bool) -> Self {
        if !enabled {
            return Self {
                sender: None,
                task: None,
            };
        }

        let is_terminal = atty::is(atty::Stream::Stderr);
        let (sender, receiver) = progress_channel();
        let task = tokio::spawn(render(receiver, is_terminal));

        Self {
            sender: Some(sender),
            task: Some(task),
        }
    }

    /// Sender to pass in `LoadOptions`
    pub fn sender(&self) -> Option<ProgressSender> {
        self.sender.clone()
    }

    /// Wait for the renderer to drain
    ///
    /// Every sender handed out must have been dropped, or this waits forever.
    pub async fn finish(mut self) {
        self.sender.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn render(mut receiver: ProgressReceiver, is_terminal: bool) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = receiver.recv().await {
        match event {
            TransferEvent::Started {
                url,
                encoding,
                expected_size,
                durable,
            } => {
                let target = if durable { "storage" } else { "memory" };
                if is_terminal {
                    let pb = new_bar(expected_size);
                    pb.set_message(format!("{} -> {}", encoding, target));
                    bar = Some(pb);
                } else {
                    eprintln!("Downloading {} ({}) into {}", url, encoding, target);
                }
            }
            TransferEvent::Progress { bytes } => {
                if let Some(pb) = &bar {
                    pb.set_position(bytes);
                }
            }
            TransferEvent::Finished { bytes } => {
                if let Some(pb) = bar.take() {
                    pb.set_position(bytes);
                    pb.finish_and_clear();
                }
                if !is_terminal {
                    eprintln!("Downloaded {}", HumanBytes(bytes));
                }
            }
        }
    }

    // Transfer ended without a Finished event
    if let Some(pb) = bar.take() {
        pb.abandon();
    }
    debug!("Progress display finished");
}

fn new_bar(expected_size: Option<u64>) -> ProgressBar {
    match expected_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}
