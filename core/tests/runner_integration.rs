//! End-to-end tests for the run/interact loop.
//!
//! These drive real child processes with `sh` as the interpreter, so they only
//! run on unix.
#![cfg(unix)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use runpad_core::api::{
    MarkerMode, RunConfig, RunError, RunHost, RunReport, RunState, Runner, SourceBuffer,
    STOPPED_MESSAGE,
};

/// Host that answers prompts from a queue and records every call.
#[derive(Default)]
struct RecordingHost {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
    reports: Mutex<Vec<RunReport>>,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
}

impl RecordingHost {
    fn with_replies(replies: &[Option<&str>]) -> Arc<Self> {
        let host = Self::default();
        *host.replies.lock().unwrap() = replies.iter().map(|r| r.map(str::to_string)).collect();
        Arc::new(host)
    }

    fn enter(&self) {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn single_report(&self) -> RunReport {
        let reports = self.reports.lock().unwrap();
        assert_eq!(reports.len(), 1, "expected exactly one report");
        reports[0].clone()
    }
}

#[async_trait]
impl RunHost for RecordingHost {
    async fn on_input_requested(&self, prompt: &str) -> Option<String> {
        self.enter();
        self.prompts.lock().unwrap().push(prompt.to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        self.leave();
        reply
    }

    async fn on_run_complete(&self, report: RunReport) {
        self.enter();
        self.reports.lock().unwrap().push(report);
        self.leave();
    }
}

fn sh_config(scratch: &TempDir) -> RunConfig {
    RunConfig {
        interpreter: "sh".to_string(),
        interpreter_args: Vec::new(),
        scratch_dir: scratch.path().to_path_buf(),
        scratch_extension: ".sh".to_string(),
        ..RunConfig::default()
    }
}

async fn run_script(cfg: RunConfig, script: &str, host: Arc<RecordingHost>) -> RunState {
    let runner = Runner::new(cfg);
    let session = runner.start(SourceBuffer::new(script), host).unwrap();
    tokio::time::timeout(Duration::from_secs(10), session.wait())
        .await
        .expect("run did not finish in time")
}

#[tokio::test]
async fn silent_script_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let state = run_script(sh_config(&dir), "", host.clone()).await;

    assert_eq!(state, RunState::Done);
    let report = host.single_report();
    assert!(report.stdout_lines.is_empty());
    assert_eq!(report.stderr, "");
    assert_eq!(report.exit_code, Some(0));
    assert_eq!(report.state, RunState::Done);
}

#[tokio::test]
async fn stdout_lines_arrive_in_order() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let script = "echo one\necho two\necho 'three  spaced'\n";
    run_script(sh_config(&dir), script, host.clone()).await;

    let report = host.single_report();
    assert_eq!(
        report.stdout_lines,
        vec!["one".to_string(), "two".to_string(), "three  spaced".to_string()]
    );
    assert!(host.prompts().is_empty());
}

#[tokio::test]
async fn any_stderr_discards_stdout() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let script = "echo before\necho boom 1>&2\necho after\n";
    let state = run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(state, RunState::Done);
    let report = host.single_report();
    assert!(report.stdout_lines.is_empty());
    assert_eq!(report.stderr, "boom\n");
    assert!(report.is_error());
}

#[tokio::test]
async fn reply_is_written_before_more_stdout_is_read() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[Some("42")]);
    let script = "echo '>>> Enter a number: '\nread n\necho \"got:$n\"\n";
    run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(host.prompts(), vec!["Enter a number: ".to_string()]);
    let report = host.single_report();
    assert_eq!(report.stdout_lines, vec!["got:42".to_string()]);
}

#[tokio::test]
async fn marker_anywhere_in_line_is_a_prompt() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[Some("ok")]);
    let script = "echo 'result: >>> done'\nread x\necho \"$x\"\n";
    run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(host.prompts(), vec!["done".to_string()]);
    assert_eq!(host.single_report().stdout_lines, vec!["ok".to_string()]);
}

#[tokio::test]
async fn prefix_mode_keeps_mid_line_markers_as_output() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let mut cfg = sh_config(&dir);
    cfg.marker_mode = MarkerMode::Prefix;
    run_script(cfg, "echo 'result: >>> done'\n", host.clone()).await;

    assert!(host.prompts().is_empty());
    assert_eq!(
        host.single_report().stdout_lines,
        vec!["result: >>> done".to_string()]
    );
}

#[tokio::test]
async fn declined_prompt_forwards_empty_line() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[None]);
    let script = "echo '>>> name? '\nread name\necho \"[$name]\"\n";
    run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(host.single_report().stdout_lines, vec!["[]".to_string()]);
}

#[tokio::test]
async fn several_prompts_are_sequential() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[Some("a"), Some("b"), Some("c")]);
    let script = "\
for i in 1 2 3; do
  echo \">>> q$i\"
  read v
  echo \"$i=$v\"
done
";
    run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(
        host.prompts(),
        vec!["q1".to_string(), "q2".to_string(), "q3".to_string()]
    );
    assert_eq!(
        host.single_report().stdout_lines,
        vec!["1=a".to_string(), "2=b".to_string(), "3=c".to_string()]
    );
    assert_eq!(host.overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exit_code_is_reported() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    run_script(sh_config(&dir), "echo bye\nexit 3\n", host.clone()).await;

    let report = host.single_report();
    assert_eq!(report.exit_code, Some(3));
    assert_eq!(report.stdout_lines, vec!["bye".to_string()]);
}

#[tokio::test]
async fn spawn_failure_reports_once() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let mut cfg = sh_config(&dir);
    cfg.interpreter = "/nonexistent/runtime-for-runpad".to_string();
    let runner = Runner::new(cfg);

    let session = runner
        .start(SourceBuffer::new("print(1)"), host.clone())
        .unwrap();
    let state = session.wait().await;

    assert_eq!(state, RunState::Failed);
    let report = host.single_report();
    assert!(report.stdout_lines.is_empty());
    assert!(report.stderr.contains("failed to spawn process"));
    assert_eq!(report.state, RunState::Failed);
    assert!(!runner.is_busy());
}

#[tokio::test]
async fn second_start_while_busy_is_rejected() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let runner = Runner::new(sh_config(&dir));

    let first = runner
        .start(SourceBuffer::new("sleep 5\n"), host.clone())
        .unwrap();
    let err = runner
        .start(SourceBuffer::new("echo hi\n"), host.clone())
        .unwrap_err();
    assert!(matches!(err, RunError::Busy { ref active } if active == first.id()));

    assert!(runner.stop_active());
    let state = tokio::time::timeout(Duration::from_secs(5), first.wait())
        .await
        .unwrap();
    assert_eq!(state, RunState::Stopped);
    assert!(!runner.is_busy());

    let again = runner
        .start(SourceBuffer::new("echo hi\n"), host.clone())
        .unwrap();
    assert_eq!(again.wait().await, RunState::Done);
}

#[tokio::test]
async fn stop_kills_a_running_child() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let runner = Runner::new(sh_config(&dir));

    let session = runner
        .start(SourceBuffer::new("echo started\nsleep 30\necho never\n"), host.clone())
        .unwrap();
    let mut states = session.state_changes();
    states
        .wait_for(|s| *s == RunState::Reading)
        .await
        .unwrap();
    session.stop();

    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .expect("stop did not end the run");
    assert_eq!(state, RunState::Stopped);
    let report = host.single_report();
    assert_eq!(report.stderr, STOPPED_MESSAGE);
    assert!(report.stdout_lines.is_empty());
}

#[tokio::test]
async fn stop_while_prompting_ends_the_run() {
    let dir = TempDir::new().unwrap();

    /// Never answers, like a user who walked away from the dialog.
    struct SilentHost(Mutex<Vec<RunReport>>);

    #[async_trait]
    impl RunHost for SilentHost {
        async fn on_input_requested(&self, _prompt: &str) -> Option<String> {
            std::future::pending().await
        }

        async fn on_run_complete(&self, report: RunReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    let host = Arc::new(SilentHost(Mutex::new(Vec::new())));
    let runner = Runner::new(sh_config(&dir));
    let session = runner
        .start(SourceBuffer::new("echo '>>> wait'\nread x\n"), host.clone())
        .unwrap();
    session
        .state_changes()
        .wait_for(|s| *s == RunState::Prompting)
        .await
        .unwrap();
    session.stop();

    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .unwrap();
    assert_eq!(state, RunState::Stopped);
    assert_eq!(host.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn stop_while_draining_ends_the_run() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let runner = Runner::new(sh_config(&dir));

    // stdout closes at once but the child keeps running.
    let session = runner
        .start(SourceBuffer::new("exec 1>&-\nsleep 30\n"), host.clone())
        .unwrap();
    session
        .state_changes()
        .wait_for(|s| *s == RunState::Draining)
        .await
        .unwrap();
    assert!(runner.is_busy());
    session.stop();

    let state = tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .expect("stop did not end a draining run");
    assert_eq!(state, RunState::Stopped);
    assert!(!runner.is_busy());
    let report = host.single_report();
    assert_eq!(report.stderr, STOPPED_MESSAGE);
}

#[tokio::test]
async fn scratch_file_is_removed_after_run() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    run_script(sh_config(&dir), "echo hi\n", host.clone()).await;

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn keep_scratch_leaves_the_session_file() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    let mut cfg = sh_config(&dir);
    cfg.keep_scratch = true;
    run_script(cfg, "echo hi\n", host.clone()).await;

    let report = host.single_report();
    let expected = dir.path().join(format!("run-{}.sh", report.session_id));
    assert_eq!(std::fs::read_to_string(expected).unwrap(), "echo hi\n");
}

#[tokio::test]
async fn heavy_stderr_does_not_deadlock() {
    let dir = TempDir::new().unwrap();
    let host = RecordingHost::with_replies(&[]);
    // Well past a 64 KiB pipe buffer before any stdout is written.
    let script = "i=0\nwhile [ $i -lt 4000 ]; do echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx' 1>&2; i=$((i+1)); done\necho done\n";
    let state = run_script(sh_config(&dir), script, host.clone()).await;

    assert_eq!(state, RunState::Done);
    let report = host.single_report();
    assert!(report.stderr.len() > 64 * 1024);
    assert!(report.stdout_lines.is_empty());
}
