use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use runpad_core::api as core_api;
use runpad_core::api::{
    ChannelHost, RunEvent, RunHost, RunReport, RunSession, RunState, Runner, SourceBuffer,
    TextBuffer,
};
use tokio::sync::{mpsc, oneshot};

/// What the keyboard is currently typing into.
#[derive(Debug)]
pub enum InputMode {
    Normal,
    /// The running script is waiting for a reply.
    Prompt {
        prompt: String,
        input: String,
        reply: Option<oneshot::Sender<Option<String>>>,
    },
    OpenPath {
        input: String,
    },
    SavePath {
        input: String,
    },
}

impl InputMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, InputMode::Normal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    Submit(String),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Finished(RunState),
}

/// Contents of the output pane. Either stdout or error text, never both.
#[derive(Debug, Clone, Default)]
pub struct OutputPane {
    pub lines: Vec<String>,
    pub is_error: bool,
}

impl OutputPane {
    fn clear(&mut self) {
        self.lines.clear();
        self.is_error = false;
    }

    fn show_report(&mut self, report: &RunReport) {
        if report.is_error() {
            self.lines = report.stderr.lines().map(str::to_string).collect();
            self.is_error = true;
        } else {
            self.lines = report.stdout_lines.clone();
            self.is_error = false;
        }
    }
}

pub struct TuiApp {
    pub buffer: TextBuffer,
    pub output: OutputPane,
    pub mode: InputMode,
    pub status: String,
    pub run_status: RunStatus,
    pub scroll: usize,
    /// First visible column of the code pane.
    pub hscroll: usize,
    pub should_quit: bool,
    quit_armed: bool,
    /// Path entry interrupted by a script prompt; restored once it is answered.
    suspended: Option<InputMode>,
    runner: Runner,
    host: Arc<ChannelHost>,
    run_rx: Option<mpsc::UnboundedReceiver<RunEvent>>,
    session: Option<RunSession>,
}

impl TuiApp {
    pub fn new(cfg: &core_api::AppConfig) -> Self {
        let (host, run_rx) = ChannelHost::channel();
        Self {
            buffer: TextBuffer::new(cfg.editor.tab_width),
            output: OutputPane::default(),
            mode: InputMode::Normal,
            status: "F5 run | F6 stop | ^S save | ^O open | ^Q quit".to_string(),
            run_status: RunStatus::Idle,
            scroll: 0,
            hscroll: 0,
            should_quit: false,
            quit_armed: false,
            suspended: None,
            runner: Runner::new(cfg.run.clone()),
            host: Arc::new(host),
            run_rx: Some(run_rx),
            session: None,
        }
    }

    pub fn take_run_events(&mut self) -> Option<mpsc::UnboundedReceiver<RunEvent>> {
        self.run_rx.take()
    }

    pub fn runner_busy(&self) -> bool {
        self.runner.is_busy()
    }

    pub fn title(&self) -> String {
        let name = self
            .buffer
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        if self.buffer.is_dirty() {
            format!("{name} *")
        } else {
            name
        }
    }

    pub fn open_file(&mut self, path: &Path) {
        match core_api::load_text(path) {
            Ok(loaded) => {
                self.buffer.set_text(&loaded.text);
                self.buffer.set_path(path);
                self.scroll = 0;
                self.hscroll = 0;
                self.status = format!("opened {} ({})", path.display(), loaded.encoding);
            }
            Err(e) => {
                tracing::warn!(error = %e, "open failed");
                self.status = format!("open failed: {}", describe(&e));
            }
        }
    }

    pub fn set_untitled_path(&mut self, path: PathBuf) {
        self.status = format!("new file {}", path.display());
        self.buffer.set_path(path);
    }

    pub fn save(&mut self) {
        match self.buffer.path().map(Path::to_path_buf) {
            Some(path) => self.save_as(path),
            None => {
                self.mode = InputMode::SavePath {
                    input: String::new(),
                }
            }
        }
    }

    pub fn save_as(&mut self, path: PathBuf) {
        match core_api::save_text(&path, &self.buffer.text()) {
            Ok(()) => {
                self.status = format!("saved {}", path.display());
                self.buffer.set_path(path);
                self.buffer.mark_saved();
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.status = format!("save failed: {}", describe(&e));
            }
        }
    }

    pub fn start_run(&mut self) {
        if self.runner.is_busy() {
            self.status = "a run is already in progress (F6 to stop it)".to_string();
            return;
        }
        let source = SourceBuffer::new(self.buffer.text());
        let host: Arc<dyn RunHost> = self.host.clone();
        match self.runner.start(source, host) {
            Ok(session) => {
                self.output.clear();
                self.status = format!("running with {}", self.runner.config().interpreter);
                self.run_status = RunStatus::Running;
                self.session = Some(session);
            }
            Err(e) => {
                self.status = e.to_report_text();
            }
        }
    }

    pub fn stop_run(&mut self) {
        if self.runner.stop_active() {
            self.status = "stopping run".to_string();
        } else {
            self.status = "nothing is running".to_string();
        }
    }

    pub fn handle_run_event(&mut self, ev: RunEvent) {
        match ev {
            RunEvent::InputRequested { prompt, reply } => {
                self.output.lines.push(prompt.clone());
                match std::mem::replace(&mut self.mode, InputMode::Normal) {
                    InputMode::Prompt { reply: stale, .. } => send_reply(stale, None),
                    InputMode::Normal => {}
                    path_entry => {
                        self.status = "path entry paused, the script is asking for input".to_string();
                        self.suspended = Some(path_entry);
                    }
                }
                self.mode = InputMode::Prompt {
                    prompt,
                    input: String::new(),
                    reply: Some(reply),
                };
            }
            RunEvent::Completed(report) => {
                if let Some(session) = self.session.take() {
                    if session.id() != report.session_id {
                        tracing::warn!(
                            expected = session.id(),
                            got = %report.session_id,
                            "report for unexpected session"
                        );
                    }
                }
                if matches!(self.mode, InputMode::Prompt { .. }) {
                    self.resume_path_entry();
                }
                self.output.show_report(&report);
                self.run_status = RunStatus::Finished(report.state);
                self.status = match report.exit_code {
                    Some(code) => format!(
                        "run {} (exit {code}, {:.1}s)",
                        report.state,
                        report.duration.as_secs_f64()
                    ),
                    None => format!("run {}", report.state),
                };
            }
        }
    }

    pub fn handle_terminal_event(&mut self, ev: Event) {
        if let Event::Key(key) = ev {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('q') {
            self.request_quit();
            return;
        }
        self.quit_armed = false;

        match std::mem::replace(&mut self.mode, InputMode::Normal) {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Prompt {
                prompt,
                mut input,
                reply,
            } => match edit_line(&mut input, key) {
                Some(PromptAction::Submit(text)) => {
                    send_reply(reply, Some(text));
                    self.resume_path_entry();
                }
                Some(PromptAction::Cancel) => {
                    send_reply(reply, None);
                    self.resume_path_entry();
                }
                None => {
                    self.mode = InputMode::Prompt {
                        prompt,
                        input,
                        reply,
                    }
                }
            },
            InputMode::OpenPath { mut input } => match edit_line(&mut input, key) {
                Some(PromptAction::Submit(text)) if !text.trim().is_empty() => {
                    self.open_file(Path::new(text.trim()));
                }
                Some(_) => {}
                None => self.mode = InputMode::OpenPath { input },
            },
            InputMode::SavePath { mut input } => match edit_line(&mut input, key) {
                Some(PromptAction::Submit(text)) if !text.trim().is_empty() => {
                    self.save_as(PathBuf::from(text.trim()));
                }
                Some(_) => {}
                None => self.mode = InputMode::SavePath { input },
            },
        }
    }

    fn resume_path_entry(&mut self) {
        self.mode = self.suspended.take().unwrap_or(InputMode::Normal);
    }

    fn request_quit(&mut self) {
        if self.buffer.is_dirty() && !self.quit_armed {
            self.quit_armed = true;
            self.status = "unsaved changes, press ^Q again to quit".to_string();
            return;
        }
        if let InputMode::Prompt { reply, .. } = std::mem::replace(&mut self.mode, InputMode::Normal)
        {
            send_reply(reply, None);
        }
        if self.runner.is_busy() {
            self.runner.stop_active();
        }
        self.should_quit = true;
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::F(5) => self.start_run(),
            KeyCode::Char('r') if ctrl => self.start_run(),
            KeyCode::F(6) => self.stop_run(),
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::Char('o') if ctrl => {
                self.mode = InputMode::OpenPath {
                    input: String::new(),
                }
            }
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(c) => self.buffer.insert_char(c),
            KeyCode::Enter => self.buffer.newline(),
            KeyCode::Tab => self.buffer.insert_tab(),
            KeyCode::Backspace => self.buffer.backspace(),
            KeyCode::Delete => self.buffer.delete(),
            KeyCode::Left => self.buffer.move_left(),
            KeyCode::Right => self.buffer.move_right(),
            KeyCode::Up => self.buffer.move_up(),
            KeyCode::Down => self.buffer.move_down(),
            KeyCode::Home => self.buffer.move_home(),
            KeyCode::End => self.buffer.move_end(),
            _ => {}
        }
    }

    /// Adjusts `scroll` and `hscroll` so the cursor is inside a viewport of
    /// `height` rows and `width` columns.
    pub fn ensure_cursor_visible(&mut self, height: usize, width: usize) {
        let cursor = self.buffer.cursor();
        if height > 0 {
            if cursor.row < self.scroll {
                self.scroll = cursor.row;
            } else if cursor.row >= self.scroll + height {
                self.scroll = cursor.row + 1 - height;
            }
        }
        if width > 0 {
            if cursor.col < self.hscroll {
                self.hscroll = cursor.col;
            } else if cursor.col >= self.hscroll + width {
                self.hscroll = cursor.col + 1 - width;
            }
        }
    }
}

/// Applies a key to a single-line input field.
pub fn edit_line(input: &mut String, key: KeyEvent) -> Option<PromptAction> {
    match key.code {
        KeyCode::Enter => Some(PromptAction::Submit(std::mem::take(input))),
        KeyCode::Esc => Some(PromptAction::Cancel),
        KeyCode::Backspace => {
            input.pop();
            None
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.push(c);
            None
        }
        _ => None,
    }
}

fn send_reply(reply: Option<oneshot::Sender<Option<String>>>, value: Option<String>) {
    if let Some(tx) = reply {
        if tx.send(value).is_err() {
            tracing::debug!("run ended before the reply was sent");
        }
    }
}

fn describe(err: &dyn std::error::Error) -> String {
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut TuiApp, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app() -> TuiApp {
        TuiApp::new(&core_api::AppConfig::default())
    }

    fn report(stdout: &[&str], stderr: &str, state: RunState) -> RunReport {
        RunReport::new(
            "s".to_string(),
            stdout.iter().map(|s| s.to_string()).collect(),
            stderr.to_string(),
            Some(0),
            state,
            chrono::Utc::now(),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn typing_uses_indent_helpers() {
        let mut app = app();
        type_str(&mut app, "if x:");
        app.handle_key(key(KeyCode::Enter));
        type_str(&mut app, "y");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.buffer.text(), "if x:\n    y\n    ");
    }

    #[test]
    fn prompt_reply_is_sent_on_enter() {
        let mut app = app();
        let (tx, mut rx) = oneshot::channel();
        app.handle_run_event(RunEvent::InputRequested {
            prompt: "Enter a number: ".to_string(),
            reply: tx,
        });
        assert_eq!(app.output.lines, vec!["Enter a number: ".to_string()]);
        type_str(&mut app, "42");
        assert!(rx.try_recv().is_err());
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(rx.try_recv().unwrap(), Some("42".to_string()));
        assert!(app.mode.is_normal());
        assert_eq!(app.buffer.text(), "");
    }

    #[test]
    fn escape_declines_prompt() {
        let mut app = app();
        let (tx, mut rx) = oneshot::channel();
        app.handle_run_event(RunEvent::InputRequested {
            prompt: "name?".to_string(),
            reply: tx,
        });
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn prompt_during_path_entry_keeps_the_typed_path() {
        let mut app = app();
        app.handle_key(ctrl('s'));
        type_str(&mut app, "draft.py");

        let (tx, mut rx) = oneshot::channel();
        app.handle_run_event(RunEvent::InputRequested {
            prompt: "age? ".to_string(),
            reply: tx,
        });
        assert!(matches!(app.mode, InputMode::Prompt { .. }));
        assert!(app.status.starts_with("path entry paused"));

        type_str(&mut app, "7");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(rx.try_recv().unwrap(), Some("7".to_string()));
        match &app.mode {
            InputMode::SavePath { input } => assert_eq!(input, "draft.py"),
            other => panic!("expected save prompt back, got {other:?}"),
        }
    }

    #[test]
    fn error_report_replaces_output() {
        let mut app = app();
        app.output.lines.push("stale".to_string());
        app.handle_run_event(RunEvent::Completed(report(
            &[],
            "Traceback\nValueError\n",
            RunState::Done,
        )));
        assert!(app.output.is_error);
        assert_eq!(
            app.output.lines,
            vec!["Traceback".to_string(), "ValueError".to_string()]
        );
        assert_eq!(app.run_status, RunStatus::Finished(RunState::Done));
    }

    #[test]
    fn stdout_report_is_shown() {
        let mut app = app();
        app.handle_run_event(RunEvent::Completed(report(&["a", "b"], "", RunState::Done)));
        assert!(!app.output.is_error);
        assert_eq!(app.output.lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn save_without_path_asks_for_one() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("hello.py");

        let mut app = app();
        type_str(&mut app, "print(1)");
        app.handle_key(ctrl('s'));
        assert!(matches!(app.mode, InputMode::SavePath { .. }));
        type_str(&mut app, &target.display().to_string());
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "print(1)");
        assert!(!app.buffer.is_dirty());
        assert_eq!(app.buffer.path(), Some(target.as_path()));
    }

    #[test]
    fn open_via_path_prompt() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("in.py");
        std::fs::write(&target, "x = 1\n").unwrap();

        let mut app = app();
        app.handle_key(ctrl('o'));
        type_str(&mut app, &target.display().to_string());
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.buffer.text(), "x = 1\n");
        assert!(app.status.starts_with("opened"));
    }

    #[test]
    fn open_missing_file_reports_in_status() {
        let mut app = app();
        app.open_file(Path::new("/no/such/dir/file.py"));
        assert!(app.status.starts_with("open failed"));
    }

    #[test]
    fn quit_with_unsaved_changes_needs_confirmation() {
        let mut app = app();
        type_str(&mut app, "x");
        app.handle_key(ctrl('q'));
        assert!(!app.should_quit);
        app.handle_key(ctrl('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut app = app();
        app.buffer.set_text(&"line\n".repeat(50));
        for _ in 0..30 {
            app.buffer.move_down();
        }
        app.ensure_cursor_visible(10, 80);
        assert_eq!(app.scroll, 21);
        for _ in 0..25 {
            app.buffer.move_up();
        }
        app.ensure_cursor_visible(10, 80);
        assert_eq!(app.scroll, 5);
        assert_eq!(app.hscroll, 0);
    }

    #[test]
    fn hscroll_follows_cursor_on_long_lines() {
        let mut app = app();
        app.buffer.set_text(&"x".repeat(100));
        app.buffer.move_end();
        app.ensure_cursor_visible(10, 40);
        assert_eq!(app.hscroll, 61);
        app.buffer.move_home();
        app.ensure_cursor_visible(10, 40);
        assert_eq!(app.hscroll, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_round_trip_through_ui_channel() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = core_api::AppConfig::default();
        cfg.run.interpreter = "sh".to_string();
        cfg.run.scratch_dir = dir.path().to_path_buf();
        cfg.run.scratch_extension = ".sh".to_string();

        let mut app = TuiApp::new(&cfg);
        let mut run_rx = app.take_run_events().unwrap();
        app.buffer.set_text("echo '>>> who? '\nread n\necho \"hi $n\"");

        app.handle_key(key(KeyCode::F(5)));
        assert_eq!(app.run_status, RunStatus::Running);

        loop {
            let ev = tokio::time::timeout(Duration::from_secs(10), run_rx.recv())
                .await
                .unwrap()
                .unwrap();
            let done = matches!(ev, RunEvent::Completed(_));
            app.handle_run_event(ev);
            if done {
                break;
            }
            type_str(&mut app, "bob");
            app.handle_key(key(KeyCode::Enter));
        }

        assert_eq!(app.output.lines, vec!["hi bob".to_string()]);
        assert_eq!(app.run_status, RunStatus::Finished(RunState::Done));
    }
}
