use std::path::{Path, PathBuf};

use crate::errors::RunError;

use super::types::SourceBuffer;

/// Per-session copy of the source on disk, named after the session id.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    path: PathBuf,
    keep: bool,
}

impl ScratchFile {
    pub(crate) async fn write(
        dir: &Path,
        extension: &str,
        session_id: &str,
        source: &SourceBuffer,
        keep: bool,
    ) -> Result<Self, RunError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| RunError::Scratch {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(scratch_name(session_id, extension));
        tokio::fs::write(&path, source.as_str().as_bytes())
            .await
            .map_err(|source| RunError::Scratch {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            target: "runpad.runner",
            session_id,
            path = %path.display(),
            bytes = source.as_str().len(),
            "scratch file written"
        );
        Ok(Self { path, keep })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn remove(self) {
        if self.keep {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(
                target: "runpad.runner",
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch file"
            );
        }
    }
}

fn scratch_name(session_id: &str, extension: &str) -> String {
    let ext = extension.trim();
    if ext.is_empty() {
        format!("run-{session_id}")
    } else if ext.starts_with('.') {
        format!("run-{session_id}{ext}")
    } else {
        format!("run-{session_id}.{ext}")
    }
}
