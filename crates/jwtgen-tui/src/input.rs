//! Single-line field editor.
//!
//! Cursor positions are counted in grapheme clusters so that combined
//! characters and emoji move and delete as one unit.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Glyph drawn in place of each hidden character.
pub const MASK_CHAR: char = '•';

/// Editable single-line text with a grapheme cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEditor {
    text: String,
    cursor: usize,
}

impl FieldEditor {
    /// Creates an editor holding `text` with the cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.graphemes(true).count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in graphemes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    fn byte_offset(&self, grapheme_idx: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme_idx)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    /// Inserts text at the cursor. Line breaks are dropped.
    pub fn insert_str(&mut self, text: &str) {
        let cleaned: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        if cleaned.is_empty() {
            return;
        }
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, &cleaned);
        self.cursor += cleaned.graphemes(true).count();
        // A combining mark can merge with the grapheme before it.
        self.cursor = self.cursor.min(self.grapheme_count());
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buf));
    }

    pub fn delete_prev(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = self.byte_offset(self.cursor - 1);
        let end = self.byte_offset(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
        true
    }

    pub fn delete_next(&mut self) -> bool {
        if self.cursor >= self.grapheme_count() {
            return false;
        }
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.text.replace_range(start..end, "");
        true
    }

    /// Deletes everything before the cursor.
    pub fn delete_to_start(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let end = self.byte_offset(self.cursor);
        self.text.replace_range(..end, "");
        self.cursor = 0;
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.grapheme_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    /// Applies an editing key. Returns true when the text changed.
    ///
    /// Keys with Ctrl/Alt (other than the handled shortcuts) are ignored so
    /// that the caller can bind them.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('a') if ctrl => {
                self.move_home();
                false
            }
            KeyCode::Char('e') if ctrl => {
                self.move_end();
                false
            }
            KeyCode::Char('u') if ctrl => self.delete_to_start(),
            KeyCode::Char(ch) if !ctrl && !alt => {
                self.insert_char(ch);
                true
            }
            KeyCode::Backspace => self.delete_prev(),
            KeyCode::Delete => self.delete_next(),
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Home => {
                self.move_home();
                false
            }
            KeyCode::End => {
                self.move_end();
                false
            }
            _ => false,
        }
    }

    /// Returns the slice of the (optionally masked) text that fits in `width`
    /// columns while keeping the cursor visible, plus the cursor column
    /// relative to the start of that slice.
    pub fn viewport(&self, width: u16, masked: bool) -> (String, u16) {
        let width = usize::from(width.max(1));
        let cells: Vec<String> = if masked {
            self.text
                .graphemes(true)
                .map(|_| MASK_CHAR.to_string())
                .collect()
        } else {
            self.text.graphemes(true).map(str::to_string).collect()
        };

        // Walk back from the cursor until the window is full; the cursor
        // itself needs one free column.
        let mut start = self.cursor.min(cells.len());
        let mut used = 1;
        while start > 0 {
            let w = cells[start - 1].width();
            if used + w > width {
                break;
            }
            used += w;
            start -= 1;
        }

        let cursor_col: usize = cells[start..self.cursor.min(cells.len())]
            .iter()
            .map(|g| g.width())
            .sum();

        let mut visible = String::new();
        let mut total = 0;
        for g in &cells[start..] {
            let w = g.width();
            if total + w > width {
                break;
            }
            total += w;
            visible.push_str(g);
        }

        (visible, cursor_col as u16)
    }
}
