use tokio::sync::oneshot;

use super::types::RunReport;

/// Messages from a run session to the editor surface.
///
/// This lives under `core::runner` (not the cli crate) so `core` stays UI-agnostic:
/// the TUI consumes these events on its own loop, `core` never touches widgets.
#[derive(Debug)]
pub enum RunEvent {
    /// The child printed a prompt line. Send `Some(text)` to reply or `None`
    /// (or drop the sender) to decline, which forwards an empty line.
    InputRequested {
        prompt: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Completed(RunReport),
}
