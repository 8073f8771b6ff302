use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Stderr text reported for a session ended through [`super::RunSession::stop`].
pub const STOPPED_MESSAGE: &str = "run stopped by user";

/// Immutable snapshot of the editor text taken when "run" is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    text: Arc<str>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<String> for SourceBuffer {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for SourceBuffer {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Lifecycle of a run session.
///
/// `Idle -> Spawning -> Reading <-> Prompting -> Draining -> Reporting -> Done`.
/// `Failed` and `Stopped` are the other terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Spawning,
    Reading,
    Prompting,
    Draining,
    Reporting,
    Done,
    Failed,
    Stopped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed | RunState::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Spawning => "spawning",
            RunState::Reading => "reading",
            RunState::Prompting => "prompting",
            RunState::Draining => "draining",
            RunState::Reporting => "reporting",
            RunState::Done => "done",
            RunState::Failed => "failed",
            RunState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one session, delivered exactly once to the host.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session_id: String,
    /// Empty whenever `stderr` is non-empty.
    pub stdout_lines: Vec<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl RunReport {
    /// Builds a report, dropping stdout when any stderr was captured.
    pub fn new(
        session_id: String,
        stdout_lines: Vec<String>,
        stderr: String,
        exit_code: Option<i32>,
        state: RunState,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let stdout_lines = if stderr.is_empty() {
            stdout_lines
        } else {
            Vec::new()
        };
        Self {
            session_id,
            stdout_lines,
            stderr,
            exit_code,
            state,
            started_at,
            duration,
        }
    }

    pub fn is_error(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// Stdout lines joined back into text, one trailing newline per line.
    pub fn stdout_text(&self) -> String {
        let mut out = String::new();
        for line in &self.stdout_lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
