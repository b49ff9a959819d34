//! Line state management
//!
//! This module defines the single-line cell grid, the cursor and the active
//! style, plus the renderer that turns the grid back into a string.

use std::sync::Arc;

/// SGR sequence that clears every attribute
pub const SGR_RESET: &str = "\x1b[0m";

/// Width of a tab stop
const TAB_WIDTH: usize = 8;

/// Cursor movement commands never take the cursor past this column
const MAX_COLUMN: usize = u16::MAX as usize;

/// One column of the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    /// Raw SGR sequence that was active when the cell was written
    pub style: Arc<str>,
}

/// Cursor-addressable line being assembled from terminal output.
///
/// Columns without a cell are holes: they render as blanks, and a hole
/// closes any open style before it.
#[derive(Debug, Clone)]
pub struct LineState {
    cells: Vec<Option<Cell>>,
    cursor: usize,
    /// Survives line emission; only a later SGR replaces it
    active_style: Arc<str>,
}

impl Default for LineState {
    fn default() -> Self {
        Self::new()
    }
}

impl LineState {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            cursor: 0,
            active_style: Arc::from(""),
        }
    }

    /// No column has been touched since the last emission
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active_style(&self) -> &str {
        &self.active_style
    }

    pub fn cells(&self) -> &[Option<Cell>] {
        &self.cells
    }

    fn set_cell(&mut self, col: usize, cell: Option<Cell>) {
        if col >= self.cells.len() {
            self.cells.resize(col + 1, None);
        }
        self.cells[col] = cell;
    }

    /// Put a character at the current cursor position
    pub fn put_char(&mut self, ch: char) {
        let cell = Cell {
            ch,
            style: Arc::clone(&self.active_style),
        };
        self.set_cell(self.cursor, Some(cell));
        self.cursor = self.cursor.saturating_add(1);
    }

    pub fn carriage_return(&mut self) {
        self.cursor = 0;
    }

    pub fn backspace(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Fill with styled spaces up to the next tab stop
    pub fn horizontal_tab(&mut self) {
        let next_tab = (self.cursor / TAB_WIDTH + 1) * TAB_WIDTH;
        while self.cursor < next_tab {
            self.put_char(' ');
        }
    }

    pub fn set_style(&mut self, raw: &str) {
        self.active_style = Arc::from(raw);
    }

    /// CHA - 1-based column
    pub fn cursor_to_column(&mut self, col: u16) {
        self.cursor = usize::from(col).saturating_sub(1);
    }

    pub fn cursor_forward(&mut self, n: u16) {
        let limit = self.cursor.max(MAX_COLUMN);
        self.cursor = self.cursor.saturating_add(usize::from(n)).min(limit);
    }

    pub fn cursor_backward(&mut self, n: u16) {
        self.cursor = self.cursor.saturating_sub(usize::from(n));
    }

    /// EL - 0: cursor to end, 1: start to cursor, 2: whole line
    pub fn erase_in_line(&mut self, mode: u16) {
        match mode {
            0 => self.cells.resize(self.cursor, None),
            1 => {
                for col in 0..=self.cursor {
                    self.set_cell(col, None);
                }
            }
            2 => self.clear(),
            _ => {}
        }
    }

    /// ECH - punch `n` holes starting at the cursor
    pub fn erase_chars(&mut self, n: u16) {
        for offset in 0..usize::from(n) {
            self.set_cell(self.cursor + offset, None);
        }
    }

    /// DCH - remove `n` cells at the cursor, shifting the rest left
    pub fn delete_chars(&mut self, n: u16) {
        if self.cursor >= self.cells.len() {
            return;
        }
        let end = self.cursor.saturating_add(usize::from(n)).min(self.cells.len());
        self.cells.drain(self.cursor..end);
    }

    /// ICH - insert `n` holes at the cursor, shifting the rest right
    pub fn insert_chars(&mut self, n: u16) {
        let at = self.cursor.min(self.cells.len());
        self.cells
            .splice(at..at, std::iter::repeat(None).take(usize::from(n)));
    }

    /// Apply a complete CSI sequence. `raw` is the whole matched span.
    pub fn execute_csi(&mut self, params: &[u16], command: char, raw: &str) {
        let count = params.first().copied().unwrap_or(1).max(1);

        match command {
            // SGR - Select Graphic Rendition
            'm' => self.set_style(raw),

            // Cursor movement
            'G' => self.cursor_to_column(count),
            'C' => self.cursor_forward(count),
            'D' => self.cursor_backward(count),

            // Erase
            'K' => self.erase_in_line(params.first().copied().unwrap_or(0)),
            'X' => self.erase_chars(count),

            // Character operations
            'P' => self.delete_chars(count),
            '@' => self.insert_chars(count),

            // Multi-line operations have no meaning for a single line
            'A' | 'B' | 'H' | 'f' | 'J' | 'S' | 'T' => {
                tracing::trace!("Ignoring multi-line CSI {:?}", raw);
            }

            _ => {
                tracing::debug!("Unknown CSI: params={:?}, final={:?}", params, command);
            }
        }
    }

    /// Forget the grid and cursor. The active style is kept.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.cursor = 0;
    }

    /// Render the line and reset the grid for the next one
    pub fn take_line(&mut self) -> String {
        let line = self.render();
        self.clear();
        line
    }

    /// Render the grid as a self-contained string.
    ///
    /// Style sequences are only emitted on change, holes close any open
    /// style, trailing blanks are trimmed and an open style is reset at the
    /// end of the line.
    pub fn render(&self) -> String {
        let mut result = String::with_capacity(self.cells.len());
        let mut last_style: &str = "";

        for cell in &self.cells {
            match cell {
                Some(cell) => {
                    if *cell.style != *last_style {
                        result.push_str(&cell.style);
                        last_style = &cell.style;
                    }
                    result.push(cell.ch);
                }
                None => {
                    if is_open_style(last_style) {
                        result.push_str(SGR_RESET);
                        last_style = "";
                    }
                    result.push(' ');
                }
            }
        }

        let trimmed = result.trim_end_matches(' ').len();
        result.truncate(trimmed);

        if is_open_style(last_style) {
            result.push_str(SGR_RESET);
        }

        result
    }
}

fn is_open_style(style: &str) -> bool {
    !style.is_empty() && style != SGR_RESET
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(line: &mut LineState, text: &str) {
        for ch in text.chars() {
            line.put_char(ch);
        }
    }

    #[test]
    fn test_overwrite_after_carriage_return() {
        let mut line = LineState::new();
        write(&mut line, "AAAAAAAA");
        line.carriage_return();
        write(&mut line, "BBB");
        assert_eq!(line.render(), "BBBAAAAA");
    }

    #[test]
    fn test_tab_pads_to_stop() {
        let mut line = LineState::new();
        write(&mut line, "a");
        line.horizontal_tab();
        assert_eq!(line.cursor(), 8);
        write(&mut line, "b");
        assert_eq!(line.render(), "a       b");

        // Already on a stop: move a full tab width
        line.horizontal_tab();
        assert_eq!(line.cursor(), 16);
    }

    #[test]
    fn test_backspace_clamps() {
        let mut line = LineState::new();
        line.backspace();
        assert_eq!(line.cursor(), 0);
        write(&mut line, "ABC");
        line.backspace();
        write(&mut line, "X");
        assert_eq!(line.render(), "ABX");
    }

    #[test]
    fn test_cursor_movement() {
        let mut line = LineState::new();
        write(&mut line, "AB");
        line.cursor_forward(3);
        write(&mut line, "XX");
        assert_eq!(line.render(), "AB   XX");

        line.cursor_backward(100);
        assert_eq!(line.cursor(), 0);

        line.cursor_forward(u16::MAX);
        line.cursor_forward(u16::MAX);
        assert_eq!(line.cursor(), MAX_COLUMN);
        line.carriage_return();

        line.cursor_to_column(4);
        assert_eq!(line.cursor(), 3);
        line.execute_csi(&[0], 'G', "\x1b[0G");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_erase_to_end() {
        let mut line = LineState::new();
        write(&mut line, "ABCDEFGH");
        line.cursor_to_column(4);
        line.erase_in_line(0);
        assert_eq!(line.render(), "ABC");
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn test_erase_to_cursor() {
        let mut line = LineState::new();
        write(&mut line, "ABCDEFGH");
        line.cursor_to_column(3);
        line.erase_in_line(1);
        assert_eq!(line.render(), "   DEFGH");
    }

    #[test]
    fn test_erase_whole_line() {
        let mut line = LineState::new();
        write(&mut line, "ABCDEFGH");
        line.erase_in_line(2);
        assert!(line.is_empty());
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_erase_chars() {
        let mut line = LineState::new();
        write(&mut line, "ABCDEFGH");
        line.execute_csi(&[2], 'X', "\x1b[2X");
        // Cursor is past the end: holes extend the line but render trimmed
        assert_eq!(line.len(), 10);
        assert_eq!(line.render(), "ABCDEFGH");

        line.cursor_to_column(4);
        line.erase_chars(2);
        assert_eq!(line.render(), "ABC  FGH");
    }

    #[test]
    fn test_delete_chars() {
        let mut line = LineState::new();
        write(&mut line, "ABCDEFGH");
        line.cursor_to_column(3);
        line.delete_chars(2);
        assert_eq!(line.render(), "ABEFGH");

        line.cursor_to_column(5);
        line.delete_chars(100);
        assert_eq!(line.render(), "ABEF");
    }

    #[test]
    fn test_insert_chars() {
        let mut line = LineState::new();
        write(&mut line, "ABCD");
        line.cursor_to_column(3);
        line.insert_chars(2);
        assert_eq!(line.render(), "AB  CD");

        // Past the end the holes land at the end of the grid
        line.cursor_to_column(20);
        line.insert_chars(3);
        assert_eq!(line.len(), 9);
    }

    #[test]
    fn test_unknown_and_multiline_commands_ignored() {
        let mut line = LineState::new();
        write(&mut line, "ABC");
        for command in ['A', 'B', 'H', 'f', 'J', 'S', 'T', 'Z', 'q'] {
            line.execute_csi(&[2], command, "");
        }
        assert_eq!(line.render(), "ABC");
        assert_eq!(line.cursor(), 3);
    }

    #[test]
    fn test_render_minimizes_style_changes() {
        let mut line = LineState::new();
        line.set_style("\x1b[31m");
        write(&mut line, "AAAA");
        line.set_style(SGR_RESET);
        line.carriage_return();
        line.set_style("\x1b[32m");
        write(&mut line, "BB");
        line.set_style(SGR_RESET);
        assert_eq!(line.render(), "\x1b[32mBB\x1b[31mAA\x1b[0m");
    }

    #[test]
    fn test_render_hole_closes_style() {
        let mut line = LineState::new();
        line.set_style("\x1b[31m");
        write(&mut line, "AB");
        line.cursor_forward(2);
        write(&mut line, "C");
        assert_eq!(line.render(), "\x1b[31mAB\x1b[0m  \x1b[31mC\x1b[0m");
    }

    #[test]
    fn test_render_trims_trailing_blanks() {
        let mut line = LineState::new();
        line.set_style("\x1b[34m");
        write(&mut line, "blue   ");
        assert_eq!(line.render(), "\x1b[34mblue\x1b[0m");
    }

    #[test]
    fn test_take_line_keeps_style() {
        let mut line = LineState::new();
        line.set_style("\x1b[31m");
        write(&mut line, "red");
        assert_eq!(line.take_line(), "\x1b[31mred\x1b[0m");
        assert!(line.is_empty());
        assert_eq!(line.cursor(), 0);
        assert_eq!(line.active_style(), "\x1b[31m");
    }
}
