use thiserror::Error;

use super::{ConfigError, FileError, RunError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("file error: {0}")]
    File(#[from] FileError),

    #[error("run error: {0}")]
    Run(#[from] RunError),

    #[error("terminal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Command(String),
}
