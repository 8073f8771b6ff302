mod buffer;
mod indent;

pub use buffer::{Cursor, TextBuffer};
pub use indent::{auto_indent_width, leading_indent, smart_backspace_width, TAB_WIDTH};
