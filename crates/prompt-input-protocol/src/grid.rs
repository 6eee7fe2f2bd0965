//! Owned [`TerminalBuffer`] implementation.
//!
//! The runtime materialises the emulator screen into a [`GridBuffer`] before
//! each reconciliation pass; tests build one by hand.

use std::collections::HashMap;

use unicode_width::UnicodeWidthChar;

use crate::buffer::{BufferCell, BufferLine, CellStyle, TerminalBuffer};
use crate::ids::LineMarker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    chars: String,
    width: usize,
    style: CellStyle,
}

impl Default for GridCell {
    fn default() -> Self {
        Self {
            chars: String::new(),
            width: 1,
            style: CellStyle::default(),
        }
    }
}

impl GridCell {
    pub fn new(chars: impl Into<String>, width: usize, style: CellStyle) -> Self {
        Self {
            chars: chars.into(),
            width,
            style,
        }
    }

    /// Trailing half of a wide char.
    pub fn wide_continuation(style: CellStyle) -> Self {
        Self {
            chars: String::new(),
            width: 0,
            style,
        }
    }
}

impl BufferCell for GridCell {
    fn chars(&self) -> &str {
        &self.chars
    }

    fn width(&self) -> usize {
        self.width
    }

    fn style(&self) -> CellStyle {
        self.style
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridLine {
    cells: Vec<GridCell>,
    wrapped: bool,
}

impl GridLine {
    pub fn blank(cols: usize) -> Self {
        Self {
            cells: vec![GridCell::default(); cols],
            wrapped: false,
        }
    }

    pub fn from_cells(cells: Vec<GridCell>, wrapped: bool) -> Self {
        Self { cells, wrapped }
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.wrapped = wrapped;
    }

    pub fn set_cell(&mut self, col: usize, cell: GridCell) {
        if let Some(slot) = self.cells.get_mut(col) {
            *slot = cell;
        }
    }

    /// Writes `text` starting at `col` and returns the column after it.
    ///
    /// Wide chars take two cells, zero-width chars join the previous cell.
    /// Text past the last column is dropped.
    pub fn write(&mut self, col: usize, text: &str, style: CellStyle) -> usize {
        let mut col = col;
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0);
            if width == 0 {
                if let Some(previous) = col.checked_sub(1).and_then(|prev| self.cells.get_mut(prev)) {
                    previous.chars.push(ch);
                }
                continue;
            }
            if col + width > self.cells.len() {
                break;
            }
            self.cells[col] = GridCell::new(ch.to_string(), width, style);
            if width == 2 {
                self.cells[col + 1] = GridCell::wide_continuation(style);
            }
            col += width;
        }
        col
    }
}

impl BufferLine for GridLine {
    fn len(&self) -> usize {
        self.cells.len()
    }

    fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    fn cell(&self, col: usize) -> Option<&dyn BufferCell> {
        self.cells.get(col).map(|cell| cell as &dyn BufferCell)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridBuffer {
    lines: Vec<GridLine>,
    first_row: usize,
    base_y: usize,
    rows: usize,
    cols: usize,
    cursor_x: usize,
    cursor_y: usize,
    markers: HashMap<LineMarker, usize>,
    next_marker: u64,
}

impl GridBuffer {
    /// Empty viewport with no scrollback.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self::from_lines(vec![GridLine::blank(cols); rows], 0, 0, cols, rows)
    }

    /// `lines[0]` sits at absolute row `first_row`; rows before it were not
    /// materialised.
    pub fn from_lines(
        lines: Vec<GridLine>,
        first_row: usize,
        base_y: usize,
        cols: usize,
        rows: usize,
    ) -> Self {
        Self {
            lines,
            first_row,
            base_y,
            rows,
            cols,
            cursor_x: 0,
            cursor_y: 0,
            markers: HashMap::new(),
            next_marker: 0,
        }
    }

    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    pub fn line_mut(&mut self, row: usize) -> Option<&mut GridLine> {
        let index = row.checked_sub(self.first_row)?;
        self.lines.get_mut(index)
    }

    /// Writes into an absolute row; see [`GridLine::write`].
    pub fn write(&mut self, row: usize, col: usize, text: &str, style: CellStyle) -> usize {
        self.line_mut(row)
            .map_or(col, |line| line.write(col, text, style))
    }

    pub fn set_wrapped(&mut self, row: usize, wrapped: bool) {
        if let Some(line) = self.line_mut(row) {
            line.set_wrapped(wrapped);
        }
    }

    /// Registers a marker on the absolute row under the cursor.
    pub fn register_marker(&mut self) -> LineMarker {
        self.register_marker_at(self.base_y + self.cursor_y)
    }

    pub fn register_marker_at(&mut self, row: usize) -> LineMarker {
        self.next_marker += 1;
        let marker = LineMarker::new(self.next_marker);
        self.markers.insert(marker, row);
        marker
    }

    pub fn insert_marker(&mut self, marker: LineMarker, row: usize) {
        self.markers.insert(marker, row);
    }

    pub fn forget_marker(&mut self, marker: LineMarker) -> bool {
        self.markers.remove(&marker).is_some()
    }
}

impl TerminalBuffer for GridBuffer {
    fn cursor_x(&self) -> usize {
        self.cursor_x
    }

    fn cursor_y(&self) -> usize {
        self.cursor_y
    }

    fn base_y(&self) -> usize {
        self.base_y
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn line(&self, row: usize) -> Option<&dyn BufferLine> {
        let index = row.checked_sub(self.first_row)?;
        self.lines.get(index).map(|line| line as &dyn BufferLine)
    }

    fn marker_line(&self, marker: LineMarker) -> Option<usize> {
        let row = *self.markers.get(&marker)?;
        (row >= self.first_row && row < self.first_row + self.lines.len()).then_some(row)
    }
}
