use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use runpad_core::api as core_api;
use runpad_core::api::{RunHost, RunReport, RunState};
use tokio::sync::oneshot;

use crate::commands::cli::RunArgs;

/// Host for headless runs: prompts go to stdout, replies come from stdin.
struct TerminalHost {
    done: Mutex<Option<oneshot::Sender<RunReport>>>,
}

#[async_trait]
impl RunHost for TerminalHost {
    async fn on_input_requested(&self, prompt: &str) -> Option<String> {
        let prompt = prompt.to_string();
        let read = tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
            let mut stdout = std::io::stdout();
            write!(stdout, "{prompt}")?;
            stdout.flush()?;
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
        })
        .await;

        match read {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to read reply from terminal");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "reply reader task failed");
                None
            }
        }
    }

    async fn on_run_complete(&self, report: RunReport) {
        let sender = self
            .done
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(report);
        }
    }
}

pub async fn handle_run(
    args: RunArgs,
    mut cfg: core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    if let Some(interpreter) = args.interpreter {
        cfg.run.interpreter = interpreter;
    }
    if args.strict_prompts {
        cfg.run.marker_mode = core_api::MarkerMode::Prefix;
    }
    cfg.validate()?;

    let loaded = core_api::load_text(&args.file)?;
    tracing::info!(
        path = %args.file.display(),
        encoding = loaded.encoding,
        "running script"
    );

    let (done_tx, mut done_rx) = oneshot::channel();
    let host = Arc::new(TerminalHost {
        done: Mutex::new(Some(done_tx)),
    });
    let runner = core_api::Runner::new(cfg.run);
    let session = runner.start(core_api::SourceBuffer::new(loaded.text), host)?;

    let report = tokio::select! {
        report = &mut done_rx => report,
        _ = tokio::signal::ctrl_c() => {
            session.stop();
            done_rx.await
        }
    };
    let report = report
        .map_err(|_| core_api::CliError::Command("run ended without a report".to_string()))?;

    Ok(print_report(&report))
}

/// Writes the report the way the editor's output pane shows it and returns
/// the process exit code.
fn print_report(report: &RunReport) -> i32 {
    if report.is_error() {
        eprint!("{}", report.stderr);
        if !report.stderr.ends_with('\n') {
            eprintln!();
        }
    } else {
        print!("{}", report.stdout_text());
        let _ = std::io::stdout().flush();
    }
    exit_code_for(report)
}

fn exit_code_for(report: &RunReport) -> i32 {
    match (report.state, report.exit_code) {
        (RunState::Done, Some(code)) => code,
        (RunState::Stopped, _) => 130,
        _ => 1,
    }
}
