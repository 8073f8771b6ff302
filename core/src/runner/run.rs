use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RunConfig;
use crate::errors::RunError;

use super::exit::normalize_exit;
use super::host::RunHost;
use super::marker::detect_prompt;
use super::scratch::ScratchFile;
use super::session::SlotGuard;
use super::types::{RunReport, RunState, SourceBuffer, STOPPED_MESSAGE};

pub(crate) struct WorkerInput {
    pub session_id: String,
    pub source: SourceBuffer,
    pub cfg: Arc<RunConfig>,
    pub host: Arc<dyn RunHost>,
    pub state_tx: watch::Sender<RunState>,
    pub cancel_rx: watch::Receiver<bool>,
    pub slot: SlotGuard,
}

struct Captured {
    stdout_lines: Vec<String>,
    stderr: String,
    exit_code: Option<i32>,
}

enum Interrupted {
    Stopped { exit_code: Option<i32> },
    Failed(RunError),
}

impl From<RunError> for Interrupted {
    fn from(err: RunError) -> Self {
        Interrupted::Failed(err)
    }
}

struct Worker<'a> {
    session_id: &'a str,
    cfg: &'a RunConfig,
    host: &'a dyn RunHost,
    state_tx: &'a watch::Sender<RunState>,
    cancel_rx: watch::Receiver<bool>,
}

impl Worker<'_> {
    fn set_state(&self, state: RunState) {
        tracing::debug!(
            target: "runpad.runner",
            session_id = self.session_id,
            state = state.as_str(),
            "state transition"
        );
        self.state_tx.send_replace(state);
    }
}

/// Runs one session to completion and reports exactly once.
pub(crate) async fn run_worker(input: WorkerInput) {
    let WorkerInput {
        session_id,
        source,
        cfg,
        host,
        state_tx,
        cancel_rx,
        slot,
    } = input;

    let started_at = Utc::now();
    let t0 = Instant::now();
    let mut worker = Worker {
        session_id: &session_id,
        cfg: &cfg,
        host: host.as_ref(),
        state_tx: &state_tx,
        cancel_rx,
    };

    let outcome = drive(&mut worker, &source).await;

    let (stdout_lines, stderr, exit_code, state) = match outcome {
        Ok(captured) => {
            worker.set_state(RunState::Reporting);
            (
                captured.stdout_lines,
                captured.stderr,
                captured.exit_code,
                RunState::Done,
            )
        }
        Err(Interrupted::Stopped { exit_code }) => {
            tracing::info!(target: "runpad.runner", session_id = %session_id, "run stopped");
            worker.set_state(RunState::Stopped);
            (
                Vec::new(),
                STOPPED_MESSAGE.to_string(),
                exit_code,
                RunState::Stopped,
            )
        }
        Err(Interrupted::Failed(err)) => {
            tracing::warn!(
                target: "runpad.runner",
                session_id = %session_id,
                error = %err.to_report_text(),
                "run failed"
            );
            worker.set_state(RunState::Failed);
            (Vec::new(), err.to_report_text(), None, RunState::Failed)
        }
    };

    let report = RunReport::new(
        session_id.clone(),
        stdout_lines,
        stderr,
        exit_code,
        state,
        started_at,
        t0.elapsed(),
    );
    tracing::info!(
        target: "runpad.runner",
        session_id = %session_id,
        state = state.as_str(),
        exit_code = ?report.exit_code,
        stdout_lines = report.stdout_lines.len(),
        stderr_bytes = report.stderr.len(),
        duration_ms = report.duration.as_millis() as u64,
        "run finished"
    );

    // Free the busy slot first so the editor may start another run as soon as
    // it sees this report.
    drop(slot);
    host.on_run_complete(report).await;
    if state == RunState::Done {
        state_tx.send_replace(RunState::Done);
    }
}

async fn drive(worker: &mut Worker<'_>, source: &SourceBuffer) -> Result<Captured, Interrupted> {
    worker.set_state(RunState::Spawning);
    let scratch = ScratchFile::write(
        &worker.cfg.scratch_dir,
        &worker.cfg.scratch_extension,
        worker.session_id,
        source,
        worker.cfg.keep_scratch,
    )
    .await?;

    let result = pump(worker, &scratch).await;
    scratch.remove().await;
    result
}

async fn pump(worker: &mut Worker<'_>, scratch: &ScratchFile) -> Result<Captured, Interrupted> {
    let cfg = worker.cfg;
    let mut child = Command::new(&cfg.interpreter)
        .args(&cfg.interpreter_args)
        .arg(scratch.path())
        .envs(&cfg.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: cfg.interpreter.clone(),
            source,
        })?;

    tracing::info!(
        target: "runpad.runner",
        session_id = worker.session_id,
        program = %cfg.interpreter,
        pid = ?child.id(),
        "child spawned"
    );

    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
    let mut stdin = Some(child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?);

    // Pumped concurrently so a child writing lots of stderr cannot block on a
    // full pipe while stdout is being read.
    let mut err_task: JoinHandle<std::io::Result<String>> = tokio::spawn(collect_stderr(stderr));

    let mut reader = BufReader::new(stdout);
    let mut buf: Vec<u8> = Vec::new();
    let mut stdout_lines: Vec<String> = Vec::new();

    worker.set_state(RunState::Reading);
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancelled(&mut worker.cancel_rx) => {
                return Err(stop_child(&mut child, &err_task).await);
            }
            res = reader.read_until(b'\n', &mut buf) => res,
        };
        let n = read.map_err(|source| RunError::StreamIo {
            stream: "stdout",
            source,
        })?;
        if n == 0 {
            break;
        }

        let line = decode_line(&buf);
        let Some(prompt) = detect_prompt(&line, &cfg.prompt_marker, cfg.marker_mode) else {
            stdout_lines.push(line);
            continue;
        };

        worker.set_state(RunState::Prompting);
        let reply = tokio::select! {
            biased;
            _ = cancelled(&mut worker.cancel_rx) => {
                return Err(stop_child(&mut child, &err_task).await);
            }
            reply = worker.host.on_input_requested(prompt) => reply,
        };
        let reply = reply.unwrap_or_else(|| {
            tracing::debug!(target: "runpad.runner", session_id = worker.session_id, "prompt declined");
            String::new()
        });
        if let Some(pipe) = stdin.as_mut() {
            write_reply(pipe, &reply)
                .await
                .map_err(RunError::ReplyWrite)?;
        }
        worker.set_state(RunState::Reading);
    }

    worker.set_state(RunState::Draining);
    drop(stdin.take());

    // A child (or a grandchild holding stderr) may outlive stdout, so stop
    // requests are still honoured here.
    let joined = tokio::select! {
        biased;
        _ = cancelled(&mut worker.cancel_rx) => {
            return Err(stop_child(&mut child, &err_task).await);
        }
        joined = &mut err_task => joined,
    };
    let stderr = match joined {
        Ok(res) => res.map_err(|source| RunError::StreamIo {
            stream: "stderr",
            source,
        })?,
        Err(join_err) => {
            return Err(RunError::StreamIo {
                stream: "stderr",
                source: std::io::Error::other(join_err.to_string()),
            }
            .into())
        }
    };

    let waited = tokio::select! {
        biased;
        _ = cancelled(&mut worker.cancel_rx) => {
            return Err(stop_child(&mut child, &err_task).await);
        }
        waited = child.wait() => waited,
    };
    let status = waited.map_err(|source| RunError::StreamIo {
        stream: "wait",
        source,
    })?;

    Ok(Captured {
        stdout_lines,
        stderr,
        exit_code: Some(normalize_exit(status)),
    })
}

/// Resolves once the session has been asked to stop. Pends forever if the
/// handle holding the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn stop_child(
    child: &mut Child,
    err_task: &JoinHandle<std::io::Result<String>>,
) -> Interrupted {
    if let Err(e) = child.start_kill() {
        tracing::warn!(target: "runpad.runner", error = %e, "failed to kill child");
    }
    let exit_code = match child.wait().await {
        Ok(status) => Some(normalize_exit(status)),
        Err(e) => {
            tracing::warn!(target: "runpad.runner", error = %e, "failed to reap child");
            None
        }
    };
    err_task.abort();
    Interrupted::Stopped { exit_code }
}

async fn collect_stderr(mut stderr: ChildStderr) -> std::io::Result<String> {
    let mut buf = Vec::new();
    stderr.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn write_reply(stdin: &mut ChildStdin, reply: &str) -> std::io::Result<()> {
    stdin.write_all(reply.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}

fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && buf[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn missing_pipe(stream: &'static str) -> Interrupted {
    Interrupted::Failed(RunError::StreamIo {
        stream,
        source: std::io::Error::other("pipe was not captured"),
    })
}
