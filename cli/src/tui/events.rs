use crossterm::event::{self, Event};
use tokio::sync::mpsc;

/// Reads terminal events on a dedicated thread so the UI task never blocks on
/// the terminal. The thread ends when the receiver is dropped or reading fails.
pub(crate) fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>) {
    std::thread::Builder::new()
        .name("runpad-input".to_string())
        .spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "terminal read failed");
                    break;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| tracing::error!(error = %e, "failed to start input thread"));
}
