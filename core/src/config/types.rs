use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.interpreter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "run.interpreter must not be empty".to_string(),
            ));
        }
        if self.run.prompt_marker.is_empty() {
            return Err(ConfigError::Validation(
                "run.prompt_marker must not be empty".to_string(),
            ));
        }
        if self.editor.tab_width == 0 {
            return Err(ConfigError::Validation(
                "editor.tab_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a stdout line is recognised as an interactive-input prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMode {
    /// Any line containing the marker anywhere is a prompt.
    #[default]
    Substring,
    /// Only lines starting with the marker are prompts.
    Prefix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    #[serde(default)]
    pub interpreter_args: Vec<String>,

    #[serde(default = "default_prompt_marker")]
    pub prompt_marker: String,

    #[serde(default)]
    pub marker_mode: MarkerMode,

    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_scratch_extension")]
    pub scratch_extension: String,

    #[serde(default)]
    pub keep_scratch: bool,

    #[serde(default = "default_run_env")]
    pub env: BTreeMap<String, String>,
}

fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

fn default_prompt_marker() -> String {
    ">>> ".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("runpad")
}

fn default_scratch_extension() -> String {
    ".py".to_string()
}

fn default_run_env() -> BTreeMap<String, String> {
    // Python block-buffers stdout on a pipe, which would hide prompts.
    [
        ("PYTHONUNBUFFERED".to_string(), "1".to_string()),
        ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
    ]
    .into_iter()
    .collect()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            interpreter_args: Vec::new(),
            prompt_marker: default_prompt_marker(),
            marker_mode: MarkerMode::default(),
            scratch_dir: default_scratch_dir(),
            scratch_extension: default_scratch_extension(),
            keep_scratch: false,
            env: default_run_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
}

fn default_tab_width() -> usize {
    crate::editor::TAB_WIDTH
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_width: default_tab_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("runpad")
        .join("logs")
}

fn default_log_file_prefix() -> String {
    "runpad.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file_prefix: default_log_file_prefix(),
        }
    }
}
