//! Terminal editor front end.
pub(crate) mod app;
pub(crate) mod events;
mod terminal;
pub(crate) mod ui;

use runpad_core::api::CliError;
use tokio::sync::mpsc;

pub use app::TuiApp;
pub use terminal::check_tui_support;
use terminal::{restore_terminal, setup_terminal, Tui};

/// Runs the editor until the user quits. All UI state is mutated on this task;
/// terminal input and run events both arrive as channel messages.
pub async fn run_editor(mut app: TuiApp) -> Result<(), CliError> {
    terminal::install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app).await;
    restore_terminal(&mut terminal)?;
    if app.runner_busy() {
        app.stop_run();
    }
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut TuiApp) -> Result<(), CliError> {
    let Some(mut run_rx) = app.take_run_events() else {
        return Err(CliError::Command("editor run channel already taken".to_string()));
    };
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    events::spawn_input_reader(input_tx);

    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, app))?;
        tokio::select! {
            ev = input_rx.recv() => match ev {
                Some(ev) => app.handle_terminal_event(ev),
                None => {
                    tracing::warn!("terminal input closed");
                    break;
                }
            },
            Some(ev) = run_rx.recv() => app.handle_run_event(ev),
        }
    }
    Ok(())
}
