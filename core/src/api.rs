//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `runpad_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from, AppConfig, EditorConfig, LoggingConfig, MarkerMode, RunConfig,
};
pub use crate::editor::{Cursor, TextBuffer};
pub use crate::errors::{CliError, ConfigError, FileError, RunError};
pub use crate::fileio::{load_text, save_text, LoadedText};
pub use crate::highlight::{highlight_line, Span, TokenKind};
pub use crate::runner::{
    detect_prompt, ChannelHost, RunEvent, RunHost, RunReport, RunSession, RunState, Runner,
    SourceBuffer, STOPPED_MESSAGE,
};
