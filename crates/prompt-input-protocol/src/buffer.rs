//! Read-only view of a terminal screen buffer.
//!
//! Rows are addressed absolutely: row `0` is the oldest retained scrollback
//! row and the viewport starts at [`TerminalBuffer::base_y`].

use serde::{Deserialize, Serialize};

use crate::ids::LineMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellColor {
    #[default]
    Default,
    Palette(u8),
    Rgb(u8, u8, u8),
}

/// Exact rendition of a cell. Two cells share a style only when every field
/// matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub fg: CellColor,
    pub bg: CellColor,
    pub bold: bool,
    pub italic: bool,
    pub dim: bool,
    pub underline: bool,
    pub blink: bool,
    pub inverse: bool,
    pub invisible: bool,
    pub strikethrough: bool,
    pub overline: bool,
}

impl CellStyle {
    /// Italic or dim, the usual rendering of an autosuggestion.
    pub fn is_ghost_like(&self) -> bool {
        self.italic || self.dim
    }
}

pub trait BufferCell {
    /// Grapheme stored in the cell; empty when nothing was ever written.
    fn chars(&self) -> &str;

    /// Display width in columns. `0` marks the trailing half of a wide char.
    fn width(&self) -> usize;

    fn style(&self) -> CellStyle;

    /// First code point of the cell, `0` for an empty cell.
    fn code(&self) -> u32 {
        self.chars().chars().next().map_or(0, u32::from)
    }

    fn is_blank(&self) -> bool {
        self.chars().trim().is_empty()
    }
}

pub trait BufferLine {
    /// Number of columns in the row.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set when the row continues the previous one because of a soft wrap.
    fn is_wrapped(&self) -> bool;

    fn cell(&self, col: usize) -> Option<&dyn BufferCell>;

    /// Columns up to and including the last cell that was written to.
    fn trimmed_len(&self) -> usize {
        (0..self.len())
            .rev()
            .find(|col| self.cell(*col).is_some_and(|cell| cell.code() != 0))
            .map_or(0, |col| col + 1)
    }

    /// Text of columns `start_col..end_col`.
    ///
    /// Trailing halves of wide chars are skipped, unwritten cells render as a
    /// space and `trim_right` drops the unwritten tail of the row. Spaces that
    /// were actually written are kept.
    fn translate_to_string(
        &self,
        trim_right: bool,
        start_col: usize,
        end_col: Option<usize>,
    ) -> String {
        let mut end = end_col.unwrap_or(self.len()).min(self.len());
        if trim_right {
            end = end.min(self.trimmed_len());
        }

        let mut text = String::new();
        for col in start_col..end {
            let Some(cell) = self.cell(col) else {
                break;
            };
            let chars = cell.chars();
            if !chars.is_empty() {
                text.push_str(chars);
            } else if cell.width() != 0 {
                text.push(' ');
            }
        }
        text
    }
}

pub trait TerminalBuffer {
    /// Cursor column within the viewport.
    fn cursor_x(&self) -> usize;

    /// Cursor row within the viewport.
    fn cursor_y(&self) -> usize;

    /// Absolute row of the first viewport row.
    fn base_y(&self) -> usize;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    fn line(&self, row: usize) -> Option<&dyn BufferLine>;

    /// Absolute row a marker points at, `None` once it no longer resolves.
    fn marker_line(&self, marker: LineMarker) -> Option<usize>;

    fn absolute_cursor_y(&self) -> usize {
        self.base_y() + self.cursor_y()
    }
}
