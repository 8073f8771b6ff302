use std::path::Path;

use anyhow::Context;

use super::types::{AppConfig, MarkerMode};
use crate::errors::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads `config.toml` from the working directory when present, otherwise the
/// built-in defaults, then applies `RUNPAD_*` environment overrides.
pub fn load_default() -> Result<AppConfig, ConfigError> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    let mut cfg = if path.exists() {
        parse_file(path)?
    } else {
        AppConfig::default()
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Like [`load_default`] but the file must exist.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut cfg = parse_file(path)?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn parse_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("invalid toml in {}", path.display()))
        .map_err(ConfigError::Parse)
}

pub fn apply_env_overrides(cfg: &mut AppConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub fn apply_overrides_from<F>(cfg: &mut AppConfig, get: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = get("RUNPAD_INTERPRETER") {
        if !v.trim().is_empty() {
            cfg.run.interpreter = v.trim().to_string();
        }
    }
    // The marker is taken verbatim: trailing whitespace is significant.
    if let Some(v) = get("RUNPAD_PROMPT_MARKER") {
        if !v.is_empty() {
            cfg.run.prompt_marker = v;
        }
    }
    if let Some(v) = get("RUNPAD_MARKER_MODE") {
        match v.trim().to_ascii_lowercase().as_str() {
            "substring" => cfg.run.marker_mode = MarkerMode::Substring,
            "prefix" => cfg.run.marker_mode = MarkerMode::Prefix,
            other => {
                tracing::warn!(value = other, "ignoring unknown RUNPAD_MARKER_MODE");
            }
        }
    }
    if let Some(v) = get("RUNPAD_SCRATCH_DIR") {
        if !v.trim().is_empty() {
            cfg.run.scratch_dir = v.trim().into();
        }
    }
}
