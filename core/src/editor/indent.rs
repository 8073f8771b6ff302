//! Line-local indentation heuristics.

pub const TAB_WIDTH: usize = 4;

/// Number of leading whitespace characters.
pub fn leading_indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Indent for the line opened after `line`: the same indent, one level deeper
/// when the line ends a block header (`:`).
pub fn auto_indent_width(line: &str, tab_width: usize) -> usize {
    let current = leading_indent(line);
    if line.trim().ends_with(':') {
        current + tab_width
    } else {
        current
    }
}

/// How many characters a backspace should remove when everything before the
/// cursor is whitespace: back to the previous tab stop. `None` means an
/// ordinary single-character backspace.
pub fn smart_backspace_width(before_cursor: &str, tab_width: usize) -> Option<usize> {
    if tab_width == 0 || !before_cursor.trim().is_empty() {
        return None;
    }
    let n = before_cursor.chars().count();
    if n == 0 {
        return None;
    }
    let rem = n % tab_width;
    Some(if rem != 0 { rem } else { tab_width }.min(n))
}
