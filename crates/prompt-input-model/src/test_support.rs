//! Small line-discipline fixture over [`GridBuffer`] for driving the model the
//! way a shell would: printable text, carriage returns, line feeds, cursor
//! movement and auto-wrap.

use std::collections::HashMap;

use prompt_input_protocol::buffer::{CellColor, CellStyle};
use prompt_input_protocol::event::{PromptInputEvent, PromptInputEventKind};
use prompt_input_protocol::grid::{GridBuffer, GridLine};
use prompt_input_protocol::ids::LineMarker;
use unicode_width::UnicodeWidthChar;

use crate::model::PromptInputModel;

pub(crate) struct TerminalFixture {
    cols: usize,
    rows: usize,
    lines: Vec<GridLine>,
    cursor_x: usize,
    cursor_row: usize,
    markers: HashMap<LineMarker, usize>,
    next_marker: u64,
    buffer: GridBuffer,
}

impl TerminalFixture {
    pub(crate) fn new(cols: usize, rows: usize) -> Self {
        let mut fixture = Self {
            cols,
            rows,
            lines: vec![GridLine::blank(cols); rows],
            cursor_x: 0,
            cursor_row: 0,
            markers: HashMap::new(),
            next_marker: 0,
            buffer: GridBuffer::new(cols, rows),
        };
        fixture.refresh();
        fixture
    }

    pub(crate) fn buffer(&self) -> &GridBuffer {
        &self.buffer
    }

    pub(crate) fn write(&mut self, text: &str) -> &mut Self {
        self.styled(text, CellStyle::default())
    }

    pub(crate) fn dim(&mut self, text: &str) -> &mut Self {
        self.styled(
            text,
            CellStyle {
                dim: true,
                ..CellStyle::default()
            },
        )
    }

    pub(crate) fn italic(&mut self, text: &str) -> &mut Self {
        self.styled(
            text,
            CellStyle {
                italic: true,
                ..CellStyle::default()
            },
        )
    }

    pub(crate) fn fg(&mut self, text: &str, rgb: (u8, u8, u8)) -> &mut Self {
        self.styled(
            text,
            CellStyle {
                fg: CellColor::Rgb(rgb.0, rgb.1, rgb.2),
                ..CellStyle::default()
            },
        )
    }

    /// Writes text where `\r`, `\n` and `\x08` act as control characters.
    /// The cursor column may equal `cols` while a wrap is pending.
    pub(crate) fn styled(&mut self, text: &str, style: CellStyle) -> &mut Self {
        for ch in text.chars() {
            match ch {
                '\r' => self.cursor_x = 0,
                '\n' => self.line_feed(),
                '\u{8}' => self.cursor_x = self.cursor_x.min(self.cols - 1).saturating_sub(1),
                _ => self.print(ch, style),
            }
        }
        self.refresh();
        self
    }

    pub(crate) fn left(&mut self, count: usize) -> &mut Self {
        self.cursor_x = self.cursor_x.min(self.cols - 1).saturating_sub(count);
        self.refresh();
        self
    }

    pub(crate) fn right(&mut self, count: usize) -> &mut Self {
        self.cursor_x = (self.cursor_x + count).min(self.cols - 1);
        self.refresh();
        self
    }

    pub(crate) fn up(&mut self, count: usize) -> &mut Self {
        let top = self.base_y();
        self.cursor_row = self.cursor_row.saturating_sub(count).max(top);
        self.cursor_x = self.cursor_x.min(self.cols - 1);
        self.refresh();
        self
    }

    /// Moves to a zero-based viewport position.
    pub(crate) fn move_to(&mut self, x: usize, viewport_row: usize) -> &mut Self {
        self.cursor_x = x.min(self.cols - 1);
        self.cursor_row = self.base_y() + viewport_row.min(self.rows - 1);
        self.refresh();
        self
    }

    /// Clears from the cursor to the end of the row.
    pub(crate) fn erase_to_end(&mut self) -> &mut Self {
        let from = self.cursor_x.min(self.cols);
        if let Some(line) = self.lines.get_mut(self.cursor_row) {
            for col in from..self.cols {
                line.set_cell(col, Default::default());
            }
        }
        self.refresh();
        self
    }

    pub(crate) fn register_marker(&mut self) -> LineMarker {
        self.next_marker += 1;
        let marker = LineMarker::new(self.next_marker);
        self.markers.insert(marker, self.cursor_row);
        self.refresh();
        marker
    }

    /// Registers a marker on the cursor row and starts a new prompt input.
    pub(crate) fn command_start(&mut self, model: &mut PromptInputModel) -> LineMarker {
        let marker = self.register_marker();
        model.handle_command_start(&self.buffer, marker);
        marker
    }

    fn print(&mut self, ch: char, style: CellStyle) {
        let width = ch.width().unwrap_or(0);
        if width > 0 && self.cursor_x + width > self.cols {
            self.line_feed();
            self.cursor_x = 0;
            if let Some(line) = self.lines.get_mut(self.cursor_row) {
                line.set_wrapped(true);
            }
        }
        if let Some(line) = self.lines.get_mut(self.cursor_row) {
            self.cursor_x = line.write(self.cursor_x, &ch.to_string(), style);
        }
    }

    fn line_feed(&mut self) {
        self.cursor_row += 1;
        if self.cursor_row == self.lines.len() {
            self.lines.push(GridLine::blank(self.cols));
        }
    }

    fn base_y(&self) -> usize {
        self.lines.len() - self.rows
    }

    fn refresh(&mut self) {
        let base_y = self.base_y();
        let mut buffer = GridBuffer::from_lines(self.lines.clone(), 0, base_y, self.cols, self.rows);
        buffer.set_cursor(self.cursor_x, self.cursor_row - base_y);
        for (marker, row) in &self.markers {
            buffer.insert_marker(*marker, *row);
        }
        self.buffer = buffer;
    }
}

/// Asserts the model renders as `expected`, where `|` is the cursor and
/// `[...]` wraps ghost text.
#[track_caller]
pub(crate) fn assert_prompt_input(model: &PromptInputModel, expected: &str) {
    assert_eq!(model.combined_string(false), expected.replace('\n', "\u{23CE}"));
    if let (Some(cursor), Some(ghost)) = (model.cursor_index(), model.ghost_text_index()) {
        assert!(cursor <= ghost, "cursor {cursor} must not pass ghost text {ghost}");
    }
}

pub(crate) fn event_kinds(events: &[PromptInputEvent]) -> Vec<PromptInputEventKind> {
    events.iter().map(PromptInputEvent::kind).collect()
}
