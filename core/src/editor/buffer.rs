use std::path::{Path, PathBuf};

use super::indent::{auto_indent_width, smart_backspace_width, TAB_WIDTH};

/// Cursor position; `col` counts characters, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

/// The single document being edited.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    cursor: Cursor,
    path: Option<PathBuf>,
    dirty: bool,
    tab_width: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new(TAB_WIDTH)
    }
}

impl TextBuffer {
    pub fn new(tab_width: usize) -> Self {
        Self {
            lines: vec![String::new()],
            cursor: Cursor::default(),
            path: None,
            dirty: false,
            tab_width: tab_width.max(1),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replaces the whole document and moves the cursor to the start.
    pub fn set_text(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n");
        self.lines = normalized.split('\n').map(str::to_string).collect();
        self.cursor = Cursor::default();
        self.dirty = false;
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.newline();
            return;
        }
        let idx = self.byte_index();
        self.lines[self.cursor.row].insert(idx, ch);
        self.cursor.col += 1;
        self.dirty = true;
    }

    pub fn insert_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.insert_char(ch);
        }
    }

    /// Tab inserts spaces rather than a tab character.
    pub fn insert_tab(&mut self) {
        let spaces = " ".repeat(self.tab_width);
        self.insert_str(&spaces);
    }

    /// Splits the line at the cursor and indents the new line.
    pub fn newline(&mut self) {
        let row = self.cursor.row;
        let indent = auto_indent_width(&self.lines[row], self.tab_width);
        let idx = self.byte_index();
        let rest = self.lines[row].split_off(idx);
        let mut next = " ".repeat(indent);
        next.push_str(rest.trim_start());
        self.lines.insert(row + 1, next);
        self.cursor = Cursor {
            row: row + 1,
            col: indent,
        };
        self.dirty = true;
    }

    pub fn backspace(&mut self) {
        let Cursor { row, col } = self.cursor;
        if col == 0 {
            if row == 0 {
                return;
            }
            let line = self.lines.remove(row);
            let prev = &mut self.lines[row - 1];
            let prev_len = prev.chars().count();
            prev.push_str(&line);
            self.cursor = Cursor {
                row: row - 1,
                col: prev_len,
            };
            self.dirty = true;
            return;
        }

        let before: String = self.lines[row].chars().take(col).collect();
        let width = smart_backspace_width(&before, self.tab_width).unwrap_or(1);
        let start = char_to_byte(&self.lines[row], col - width);
        let end = char_to_byte(&self.lines[row], col);
        self.lines[row].replace_range(start..end, "");
        self.cursor.col -= width;
        self.dirty = true;
    }

    /// Deletes the character under the cursor, joining lines at the end.
    pub fn delete(&mut self) {
        let Cursor { row, col } = self.cursor;
        let len = self.lines[row].chars().count();
        if col < len {
            let start = char_to_byte(&self.lines[row], col);
            let end = char_to_byte(&self.lines[row], col + 1);
            self.lines[row].replace_range(start..end, "");
            self.dirty = true;
        } else if row + 1 < self.lines.len() {
            let next = self.lines.remove(row + 1);
            self.lines[row].push_str(&next);
            self.dirty = true;
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.cursor.col = self.line_len(self.cursor.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor.col < self.line_len(self.cursor.row) {
            self.cursor.col += 1;
        } else if self.cursor.row + 1 < self.lines.len() {
            self.cursor.row += 1;
            self.cursor.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.row + 1 < self.lines.len() {
            self.cursor.row += 1;
            self.clamp_col();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor.col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor.col = self.line_len(self.cursor.row);
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn clamp_col(&mut self) {
        self.cursor.col = self.cursor.col.min(self.line_len(self.cursor.row));
    }

    fn byte_index(&self) -> usize {
        char_to_byte(&self.lines[self.cursor.row], self.cursor.col)
    }
}

fn char_to_byte(s: &str, col: usize) -> usize {
    s.char_indices().nth(col).map(|(i, _)| i).unwrap_or(s.len())
}
