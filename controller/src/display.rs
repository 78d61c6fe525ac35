//! Character display sink.
//!
//! The control loop only writes to the display; reads are limited to
//! snapshots for the management API. [`TextDisplay`] keeps the frame in
//! memory and mirrors every changed row to the log at debug level.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use tracing::{debug, warn};

pub const MAX_COLS: usize = 20;
pub const MAX_ROWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    ArrowUp,
    ArrowDown,
}

impl Glyph {
    pub fn as_char(self) -> char {
        match self {
            Self::ArrowUp => '↑',
            Self::ArrowDown => '↓',
        }
    }
}

pub trait DisplaySurface: Send + Sync {
    /// Write `text` at `(line, col)`. With `fill` the rest of the row is
    /// blanked; otherwise only the characters covered by `text` change.
    fn print(&self, line: usize, col: usize, text: &str, fill: bool);
    fn print_glyph(&self, line: usize, col: usize, glyph: Glyph);
    fn lines(&self) -> Vec<String>;
    fn cols(&self) -> usize;
    fn set_backlight(&self, on: bool);
    fn backlight(&self) -> bool;
}

pub struct TextDisplay {
    cols: usize,
    rows: usize,
    frame: Mutex<Vec<Vec<char>>>,
    backlight: AtomicBool,
}

impl TextDisplay {
    /// Geometry is capped at 20x4; zero dimensions fall back to the cap.
    pub fn new(cols: i64, rows: i64) -> Self {
        let cols = clamp_dimension(cols, MAX_COLS);
        let rows = clamp_dimension(rows, MAX_ROWS);
        Self {
            cols,
            rows,
            frame: Mutex::new(vec![vec![' '; cols]; rows]),
            backlight: AtomicBool::new(true),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn frame(&self) -> MutexGuard<'_, Vec<Vec<char>>> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clamp_cursor(&self, line: usize, col: usize) -> (usize, usize) {
        let line = if line >= self.rows {
            warn!(line, "display line out of range, using {}", self.rows - 1);
            self.rows - 1
        } else {
            line
        };
        let col = if col >= self.cols {
            warn!(col, "display column out of range, using {}", self.cols - 1);
            self.cols - 1
        } else {
            col
        };
        (line, col)
    }

    fn write_chars(&self, line: usize, col: usize, chars: impl Iterator<Item = char>) {
        let mut frame = self.frame();
        let row = &mut frame[line];
        let before: String = row.iter().collect();
        for (cell, ch) in row[col..].iter_mut().zip(chars) {
            *cell = ch;
        }
        let after: String = row.iter().collect();
        if before != after {
            debug!(line, "display: {after}");
        }
    }
}

impl Default for TextDisplay {
    fn default() -> Self {
        Self::new(MAX_COLS as i64, MAX_ROWS as i64)
    }
}

fn clamp_dimension(value: i64, max: usize) -> usize {
    match usize::try_from(value) {
        Ok(0) | Err(_) => max,
        Ok(value) => value.min(max),
    }
}

impl DisplaySurface for TextDisplay {
    fn print(&self, line: usize, col: usize, text: &str, fill: bool) {
        let (line, col) = self.clamp_cursor(line, col);
        let width = self.cols - col;
        if fill {
            let padding = width.saturating_sub(text.chars().count());
            let chars = text.chars().chain(std::iter::repeat(' ').take(padding));
            self.write_chars(line, col, chars);
        } else {
            self.write_chars(line, col, text.chars());
        }
    }

    fn print_glyph(&self, line: usize, col: usize, glyph: Glyph) {
        let (line, col) = self.clamp_cursor(line, col);
        self.write_chars(line, col, std::iter::once(glyph.as_char()));
    }

    fn lines(&self) -> Vec<String> {
        self.frame()
            .iter()
            .map(|row| row.iter().collect())
            .collect()
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn set_backlight(&self, on: bool) {
        if self.backlight.swap(on, Ordering::Relaxed) != on {
            debug!("display backlight {}", if on { "on" } else { "off" });
        }
    }

    fn backlight(&self) -> bool {
        self.backlight.load(Ordering::Relaxed)
    }
}

/// Right-align `text` within `width` columns.
pub fn rjust(text: &str, width: usize) -> String {
    format!("{text:>width$}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fill_blanks_the_rest_of_the_row() {
        let display = TextDisplay::new(10, 2);
        display.print(0, 0, "0123456789", true);
        display.print(0, 2, "ab", true);
        assert_eq!(display.lines()[0], "01ab      ");
    }

    #[test]
    fn overwrite_keeps_surrounding_text() {
        let display = TextDisplay::new(10, 2);
        display.print(1, 0, "0123456789", true);
        display.print(1, 3, "xy", false);
        assert_eq!(display.lines()[1], "012xy56789");
    }

    #[test]
    fn long_text_is_truncated_at_the_row_end() {
        let display = TextDisplay::new(8, 1);
        display.print(0, 4, "abcdefgh", true);
        assert_eq!(display.lines(), vec!["    abcd".to_string()]);
    }

    #[test]
    fn cursor_is_clamped_into_the_frame() {
        let display = TextDisplay::new(5, 2);
        display.print(9, 9, "z", false);
        assert_eq!(display.lines(), vec!["     ".to_string(), "    z".to_string()]);
    }

    #[test]
    fn glyph_replaces_one_cell() {
        let display = TextDisplay::default();
        display.print(2, 0, "HIGH", true);
        display.print_glyph(2, 11, Glyph::ArrowUp);
        assert_eq!(display.lines()[2], "HIGH       ↑        ");
    }

    #[test]
    fn backlight_starts_on_and_follows_writes() {
        let display = TextDisplay::default();
        assert!(display.backlight());
        display.set_backlight(false);
        assert!(!display.backlight());
        display.print(0, 0, "dark", true);
        assert_eq!(display.lines()[0].trim_end(), "dark");
    }

    #[test]
    fn geometry_is_capped() {
        let display = TextDisplay::new(40, 8);
        assert_eq!(display.cols(), MAX_COLS);
        assert_eq!(display.rows(), MAX_ROWS);
        assert_eq!(TextDisplay::new(0, -1).rows(), MAX_ROWS);
    }
}
