//! Detects an inline suggestion rendered after the cursor.
//!
//! Shells draw suggestions in a style the typed text never uses. Two passes
//! look for that: a cheap scan for italic or dim cells, then a partition of
//! the rest of the row by exact style to find a unique trailing run.

use std::collections::HashMap;

use prompt_input_protocol::buffer::{BufferLine, CellStyle};

use crate::text::char_len;
use crate::RIGHT_PROMPT_MIN_BLANK_CELLS;

pub(crate) struct GhostTextScan<'a> {
    pub(crate) line: &'a dyn BufferLine,
    pub(crate) cursor_x: usize,
    pub(crate) cols: usize,
    /// First input column on the cursor row.
    pub(crate) input_start_x: usize,
}

impl GhostTextScan<'_> {
    /// Index into the value where ghost text starts, if any.
    pub(crate) fn detect(&self, cursor_index: usize) -> Option<usize> {
        self.scan_ghost_styled(cursor_index)
            .or_else(|| self.scan_unique_trailing_style(cursor_index))
    }

    fn scan_ghost_styled(&self, cursor_index: usize) -> Option<usize> {
        let preceding = (0..self.cursor_x.min(self.line.len()))
            .rev()
            .filter_map(|col| self.line.cell(col))
            .find(|cell| !cell.is_blank())?;
        if preceding.style().is_ghost_like() {
            return None;
        }

        let mut offset = 0;
        for col in self.cursor_x..self.line.len() {
            let Some(cell) = self.line.cell(col) else {
                break;
            };
            if cell.width() == 0 {
                continue;
            }
            if cell.code() == 0 {
                break;
            }
            if cell.style().is_ghost_like() {
                return Some(cursor_index + offset);
            }
            offset += char_len(cell.chars());
        }
        None
    }

    fn scan_unique_trailing_style(&self, cursor_index: usize) -> Option<usize> {
        let end = self.cols.min(self.line.len());
        let mut positions: HashMap<CellStyle, Vec<usize>> = HashMap::new();
        let mut last_visible_style = None;
        for col in self.cursor_x..end {
            let Some(cell) = self.line.cell(col) else {
                break;
            };
            let style = cell.style();
            positions.entry(style).or_default().push(col);
            if !cell.is_blank() {
                last_visible_style = Some(style);
            }
        }

        let ghost_style = last_visible_style?;
        let input_style = self.line.cell(self.input_start_x).map(|cell| cell.style());
        if input_style == Some(ghost_style) {
            return None;
        }

        let run = positions.get(&ghost_style)?;
        let run_start = *run.first()?;
        if run.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            return None;
        }

        let adjacent_to_cursor = run_start <= self.cursor_x + 1;
        if !adjacent_to_cursor && self.is_right_prompt(run_start) {
            tracing::trace!(run_start, "styled run after the cursor is a right prompt");
            return None;
        }

        // Same-styled cells directly left of the cursor are a partially
        // accepted suggestion, not typed text.
        let mut boundary = self.cursor_x;
        if adjacent_to_cursor {
            while boundary > self.input_start_x
                && self
                    .line
                    .cell(boundary - 1)
                    .is_some_and(|cell| cell.style() == ghost_style)
            {
                boundary -= 1;
            }
        }
        let style_used_by_input = (self.input_start_x..boundary)
            .filter_map(|col| self.line.cell(col))
            .any(|cell| cell.code() != 0 && cell.style() == ghost_style);
        if style_used_by_input {
            return None;
        }

        let between = self
            .line
            .translate_to_string(false, self.cursor_x, Some(run_start));
        Some(cursor_index + char_len(&between))
    }

    fn is_right_prompt(&self, run_start: usize) -> bool {
        let mut blank_cells = 0;
        for col in (self.input_start_x..run_start).rev() {
            match self.line.cell(col) {
                Some(cell) if cell.is_blank() => blank_cells += 1,
                _ => break,
            }
            if blank_cells >= RIGHT_PROMPT_MIN_BLANK_CELLS {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use prompt_input_protocol::buffer::{CellColor, CellStyle};
    use prompt_input_protocol::grid::GridLine;

    use super::GhostTextScan;

    const COLS: usize = 40;

    fn red() -> CellStyle {
        CellStyle {
            fg: CellColor::Rgb(255, 0, 0),
            ..CellStyle::default()
        }
    }

    fn detect(line: &GridLine, cursor_x: usize, cursor_index: usize) -> Option<usize> {
        GhostTextScan {
            line,
            cursor_x,
            cols: COLS,
            input_start_x: 2,
        }
        .detect(cursor_index)
    }

    fn row(segments: &[(&str, CellStyle)]) -> GridLine {
        let mut line = GridLine::blank(COLS);
        let mut col = line.write(0, "$ ", CellStyle::default());
        for (text, style) in segments {
            col = line.write(col, text, *style);
        }
        line
    }

    #[test]
    fn dim_cells_after_the_cursor_are_ghost_text() {
        let dim = CellStyle {
            dim: true,
            ..CellStyle::default()
        };
        let line = row(&[("foo", CellStyle::default()), (" bar", dim)]);

        assert_eq!(detect(&line, 5, 3), Some(3));
        assert_eq!(detect(&line, 3, 1), Some(3));
    }

    #[test]
    fn unique_trailing_color_is_ghost_text() {
        let line = row(&[("foo", CellStyle::default()), (" bar", red())]);

        assert_eq!(detect(&line, 5, 3), Some(3));
        assert_eq!(detect(&line, 3, 1), Some(3));
    }

    #[test]
    fn strikethrough_run_is_ghost_text_unless_input_uses_it() {
        let strike = CellStyle {
            strikethrough: true,
            ..CellStyle::default()
        };
        let unique = row(&[("text ", CellStyle::default()), ("STRIKE", strike)]);
        assert_eq!(detect(&unique, 7, 5), Some(5));

        let reused = row(&[
            ("STRIKE1", strike),
            (" normal ", CellStyle::default()),
            ("STRIKE2", strike),
        ]);
        assert_eq!(detect(&reused, 17, 15), None);
    }

    #[test]
    fn style_matching_earlier_input_is_not_ghost_text() {
        let line = row(&[
            ("red1", red()),
            (" cmd ", CellStyle::default()),
            ("red2", red()),
        ]);

        assert_eq!(detect(&line, 11, 9), None);
    }

    #[test]
    fn right_prompt_is_not_ghost_text() {
        let line = row(&[("cmd      ", CellStyle::default()), ("RP", red())]);

        assert_eq!(detect(&line, 5, 3), None);
    }

    #[test]
    fn short_gap_before_styled_run_is_still_ghost_text() {
        let line = row(&[("cmd  ", CellStyle::default()), ("tail", red())]);

        assert_eq!(detect(&line, 5, 3), Some(5));
    }

    #[test]
    fn partially_accepted_suggestion_keeps_remaining_ghost_text() {
        let dim = CellStyle {
            dim: true,
            ..CellStyle::default()
        };
        let line = row(&[("find", CellStyle::default()), (" test", dim)]);

        assert_eq!(detect(&line, 8, 6), Some(6));
    }

    #[test]
    fn discontiguous_run_is_not_ghost_text() {
        let line = row(&[
            ("ab", CellStyle::default()),
            ("x", red()),
            ("y", CellStyle::default()),
            ("z", red()),
        ]);

        assert_eq!(detect(&line, 4, 2), None);
    }
}
