use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::events::RunEvent;
use super::types::RunReport;

/// Callbacks a run session makes into the editor surface.
///
/// Calls for one session never overlap: zero or more `on_input_requested`
/// followed by exactly one `on_run_complete`.
#[async_trait]
pub trait RunHost: Send + Sync {
    /// Asks the user for a reply. `None` means the user declined.
    async fn on_input_requested(&self, prompt: &str) -> Option<String>;

    async fn on_run_complete(&self, report: RunReport);
}

/// Host that marshals both callbacks onto the UI loop as [`RunEvent`]s.
#[derive(Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelHost {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl RunHost for ChannelHost {
    async fn on_input_requested(&self, prompt: &str) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let event = RunEvent::InputRequested {
            prompt: prompt.to_string(),
            reply: reply_tx,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(target: "runpad.runner", "ui channel closed, declining prompt");
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    async fn on_run_complete(&self, report: RunReport) {
        if self.tx.send(RunEvent::Completed(report)).is_err() {
            tracing::debug!(target: "runpad.runner", "ui channel closed, report dropped");
        }
    }
}
