use runpad_core::api as core_api;

use crate::commands::cli::EditArgs;
use crate::tui;

pub async fn handle_edit(args: EditArgs, cfg: core_api::AppConfig) -> Result<(), core_api::CliError> {
    tui::check_tui_support()?;

    let mut app = tui::TuiApp::new(&cfg);
    if let Some(path) = args.file {
        if path.exists() {
            app.open_file(&path);
        } else {
            // New file: the first save writes it.
            app.set_untitled_path(path);
        }
    }

    tracing::info!(interpreter = %cfg.run.interpreter, "editor starting");
    tui::run_editor(app).await
}
