mod events;
pub mod exit;
mod host;
mod marker;
mod run;
mod scratch;
mod session;
pub mod types;

pub use events::RunEvent;
pub use host::{ChannelHost, RunHost};
pub use marker::detect_prompt;
pub use session::{RunSession, Runner};
pub use types::{RunReport, RunState, SourceBuffer, STOPPED_MESSAGE};
