mod cli_error;
mod config_error;
mod file_error;
mod runner_error;

pub use cli_error::CliError;
pub use config_error::ConfigError;
pub use file_error::FileError;
pub use runner_error::RunError;
