use runpad_core::api::{CliError, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level))
}

/// Logs to a daily-rolling file. Keep the guard alive until exit or buffered
/// lines are lost.
pub fn init_file(cfg: &LoggingConfig) -> Result<WorkerGuard, CliError> {
    std::fs::create_dir_all(&cfg.dir)?;
    let appender = tracing_appender::rolling::daily(&cfg.dir, &cfg.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cfg))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

/// Headless runs share stderr with the script, so only `RUST_LOG` enables
/// anything here.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
