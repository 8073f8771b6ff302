use clap::Parser;
mod commands;
mod logging;
mod tui;
use commands::cli;
use runpad_core::api as core_api;

#[tokio::main]
async fn main() -> Result<(), core_api::CliError> {
    let mut args = cli::Args::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => core_api::load_from(path)?,
        None => core_api::load_default()?,
    };

    let cmd = args.command.take().unwrap_or(cli::Commands::Edit(cli::EditArgs {
        file: args.file.take(),
    }));
    dispatch(cmd, cfg).await
}

async fn dispatch(cmd: cli::Commands, cfg: core_api::AppConfig) -> Result<(), core_api::CliError> {
    match cmd {
        cli::Commands::Edit(edit_args) => {
            // The terminal belongs to the editor, so logs go to a file.
            let _guard = logging::init_file(&cfg.logging)?;
            commands::edit::handle_edit(edit_args, cfg).await
        }
        cli::Commands::Run(run_args) => {
            logging::init_stderr();
            let exit = commands::run::handle_run(run_args, cfg).await?;
            std::process::exit(exit);
        }
    }
}
