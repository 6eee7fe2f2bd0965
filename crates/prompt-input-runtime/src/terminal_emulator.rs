use std::collections::HashMap;

use prompt_input_protocol::buffer::{CellColor, CellStyle};
use prompt_input_protocol::error::{PromptInputError, PromptInputResult};
use prompt_input_protocol::grid::{GridBuffer, GridCell, GridLine};
use prompt_input_protocol::ids::LineMarker;

/// Rows vt100 keeps beyond a full viewport so counting pushed rows never hits
/// the scrollback cap within a single byte.
const SCROLLBACK_COUNTING_HEADROOM: usize = 2;

/// vt100 screen exposed to the model as a [`GridBuffer`].
///
/// Absolute row `0` is the oldest row vt100 still keeps in scrollback, so the
/// viewport starts at the current scrollback length. Only the viewport and
/// the newest scrollback rows (bounded by both the scrollback limit and
/// `scrollback_window_rows`) are materialised.
///
/// Markers are stored against every row ever written; `trimmed_rows` counts
/// the rows vt100 has since dropped from the front of its scrollback.
pub struct TerminalEmulator {
    parser: vt100::Parser,
    scrollback_limit: usize,
    retained_rows: usize,
    scrollback_window_rows: usize,
    markers: HashMap<LineMarker, usize>,
    trimmed_rows: usize,
    next_marker: u64,
}

impl TerminalEmulator {
    pub fn new(
        cols: u16,
        rows: u16,
        scrollback_limit: usize,
        scrollback_window_rows: usize,
    ) -> PromptInputResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(PromptInputError::Configuration(
                "terminal emulator requires non-zero rows and columns".to_owned(),
            ));
        }

        let retained_rows =
            scrollback_limit.max(usize::from(rows) + SCROLLBACK_COUNTING_HEADROOM);
        Ok(Self {
            parser: vt100::Parser::new(rows, cols, retained_rows),
            scrollback_limit,
            retained_rows,
            scrollback_window_rows,
            markers: HashMap::new(),
            trimmed_rows: 0,
            next_marker: 0,
        })
    }

    pub fn process(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.markers.is_empty() {
            self.parser.process(bytes);
            return;
        }
        for byte in bytes {
            self.process_counting_trimmed_rows(std::slice::from_ref(byte));
        }
    }

    /// Feeds `bytes` to vt100 and adds the rows it dropped from the front of
    /// its scrollback to `trimmed_rows`.
    ///
    /// While scrolled back, vt100 moves the view offset one row further for
    /// every row pushed into scrollback, capped at the scrollback length.
    /// Starting from an offset of 1 the final offset counts the pushed rows
    /// unless the cap was reached. When the count is lost the markers can no
    /// longer be placed and are dropped.
    fn process_counting_trimmed_rows(&mut self, bytes: &[u8]) {
        let screen = self.parser.screen_mut();
        let was_alternate = screen.alternate_screen();
        let len_before = scrollback_rows(screen);
        screen.set_scrollback(1);

        self.parser.process(bytes);

        let screen = self.parser.screen_mut();
        let offset = screen.scrollback();
        let len_after = scrollback_rows(screen);
        let is_alternate = screen.alternate_screen();
        screen.set_scrollback(0);

        if was_alternate || is_alternate {
            return;
        }
        if len_after < len_before {
            // Only a full reset shrinks the scrollback.
            tracing::trace!(markers = self.markers.len(), "terminal reset, dropping line markers");
            self.markers.clear();
            return;
        }
        if len_before == 0 || len_after < self.retained_rows {
            return;
        }
        if offset < len_after {
            let pushed = offset.saturating_sub(1);
            self.trimmed_rows += (len_before + pushed).saturating_sub(len_after);
        } else {
            tracing::trace!(
                markers = self.markers.len(),
                "scrolled rows could not be counted, dropping line markers"
            );
            self.markers.clear();
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> PromptInputResult<()> {
        if cols == 0 || rows == 0 {
            return Err(PromptInputError::Configuration(
                "terminal emulator resize requires non-zero rows and columns".to_owned(),
            ));
        }

        self.parser.screen_mut().set_size(rows, cols);
        Ok(())
    }

    /// `(cols, rows)` of the viewport.
    pub fn size(&self) -> (u16, u16) {
        let (rows, cols) = self.parser.screen().size();
        (cols, rows)
    }

    /// Marks the absolute row under the cursor.
    pub fn register_marker(&mut self) -> LineMarker {
        let (cursor_row, _) = self.parser.screen().cursor_position();
        let row = self.trimmed_rows + self.scrollback_len() + usize::from(cursor_row);
        self.next_marker += 1;
        let marker = LineMarker::new(self.next_marker);
        self.markers.insert(marker, row);
        marker
    }

    pub fn forget_marker(&mut self, marker: LineMarker) -> bool {
        self.markers.remove(&marker).is_some()
    }

    /// Copies the viewport and the scrollback window into an owned buffer.
    pub fn grid(&mut self) -> GridBuffer {
        let screen = self.parser.screen_mut();
        let previous_offset = screen.scrollback();
        let scrollback_len = scrollback_rows(screen);
        let window = scrollback_len
            .min(self.scrollback_window_rows)
            .min(self.scrollback_limit);
        let (rows, cols) = screen.size();

        let mut rows_read = Vec::with_capacity(window + usize::from(rows));
        // Scrolling back by `n` rows puts scrollback row `len - n` at the top
        // of the visible screen.
        let mut next = scrollback_len - window;
        while next < scrollback_len {
            screen.set_scrollback(scrollback_len - next);
            let count = u16::try_from(scrollback_len - next)
                .map_or(rows, |remaining| remaining.min(rows));
            for row in 0..count {
                rows_read.push(read_row(screen, row, cols));
            }
            next += usize::from(count);
        }
        screen.set_scrollback(0);
        for row in 0..rows {
            rows_read.push(read_row(screen, row, cols));
        }
        let (cursor_row, cursor_col) = screen.cursor_position();
        screen.set_scrollback(previous_offset);

        // vt100 flags the row that overflows; the buffer flags the row that
        // continues it.
        let mut lines = Vec::with_capacity(rows_read.len());
        let mut continues_previous = false;
        for (cells, wraps_into_next) in rows_read {
            lines.push(GridLine::from_cells(cells, continues_previous));
            continues_previous = wraps_into_next;
        }

        let mut grid = GridBuffer::from_lines(
            lines,
            scrollback_len - window,
            scrollback_len,
            usize::from(cols),
            usize::from(rows),
        );
        grid.set_cursor(usize::from(cursor_col), usize::from(cursor_row));
        for (marker, row) in &self.markers {
            if let Some(row) = row.checked_sub(self.trimmed_rows) {
                grid.insert_marker(*marker, row);
            }
        }
        grid
    }

    fn scrollback_len(&mut self) -> usize {
        scrollback_rows(self.parser.screen_mut())
    }
}

/// Rows currently held in scrollback. Leaves the view offset untouched.
fn scrollback_rows(screen: &mut vt100::Screen) -> usize {
    let previous_offset = screen.scrollback();
    screen.set_scrollback(usize::MAX);
    let len = screen.scrollback();
    screen.set_scrollback(previous_offset);
    len
}

fn read_row(screen: &vt100::Screen, row: u16, cols: u16) -> (Vec<GridCell>, bool) {
    let cells = (0..cols)
        .map(|col| screen.cell(row, col).map_or_else(GridCell::default, grid_cell))
        .collect();
    (cells, screen.row_wrapped(row))
}

fn grid_cell(cell: &vt100::Cell) -> GridCell {
    let style = CellStyle {
        fg: cell_color(cell.fgcolor()),
        bg: cell_color(cell.bgcolor()),
        bold: cell.bold(),
        italic: cell.italic(),
        dim: cell.dim(),
        underline: cell.underline(),
        inverse: cell.inverse(),
        ..CellStyle::default()
    };
    if cell.is_wide_continuation() {
        return GridCell::wide_continuation(style);
    }
    let width = if cell.is_wide() { 2 } else { 1 };
    GridCell::new(cell.contents().to_string(), width, style)
}

fn cell_color(color: vt100::Color) -> CellColor {
    match color {
        vt100::Color::Default => CellColor::Default,
        vt100::Color::Idx(index) => CellColor::Palette(index),
        vt100::Color::Rgb(r, g, b) => CellColor::Rgb(r, g, b),
    }
}
