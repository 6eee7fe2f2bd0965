//! Reconciliation pass: rebuilds value, cursor and ghost text from the buffer.
//!
//! Everything is computed into locals and handed back as a [`SyncOutcome`];
//! the model only commits it when the whole pass succeeded.

use prompt_input_protocol::buffer::{BufferLine, TerminalBuffer};
use prompt_input_protocol::error::{PromptInputError, PromptInputResult};
use prompt_input_protocol::state::ShellType;
use unicode_width::UnicodeWidthStr;

use crate::ghost_text::GhostTextScan;
use crate::model::PromptInputModel;
use crate::text::{char_len, leading_spaces, relative_cursor_index, slice_from, trim_end_len};
use crate::whitespace::{reconcile_trailing_whitespace, WhitespaceContext};
use crate::FISH_NEWLINE_MIN_INDENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncOutcome {
    pub(crate) value: String,
    pub(crate) cursor_index: usize,
    pub(crate) ghost_text_index: Option<usize>,
    pub(crate) consumed_user_input: bool,
}

impl PromptInputModel {
    pub(crate) fn reconcile(
        &self,
        buffer: &dyn TerminalBuffer,
    ) -> PromptInputResult<Option<SyncOutcome>> {
        let Some(marker) = self.command_start_marker else {
            tracing::trace!("prompt input sync skipped without a command start marker");
            return Ok(None);
        };
        let Some(mut start_y) = buffer.marker_line(marker) else {
            tracing::trace!(
                marker = marker.id(),
                "prompt input sync skipped, command start marker no longer resolves"
            );
            return Ok(None);
        };

        let is_fish = self.shell_type == Some(ShellType::Fish);
        let continuation_prompt = self.continuation_prompt.as_deref();
        let cursor_x = buffer.cursor_x();
        let cursor_y = buffer.absolute_cursor_y();
        let mut start_x = self.command_start_x;

        let mut command_line = buffer
            .line(start_y)
            .map(|line| line.translate_to_string(true, start_x, None));
        // Fish may print its prompt and then move input to the next row.
        if is_fish && command_line.as_deref().map_or(true, str::is_empty) {
            start_y += 1;
            start_x = 0;
            command_line = buffer
                .line(start_y)
                .map(|line| line.translate_to_string(true, 0, None));
        }
        let (Some(start_line), Some(command_line)) = (buffer.line(start_y), command_line) else {
            tracing::trace!(row = start_y, "prompt input sync skipped, start row is missing");
            return Ok(None);
        };

        let mut cursor_index = if cursor_y == start_y {
            relative_cursor_index(start_line, start_x, cursor_x).min(char_len(&command_line))
        } else {
            trim_end_len(&command_line)
        };
        let mut value = command_line;

        for row in start_y + 1..=cursor_y {
            let Some(line) = buffer.line(row) else {
                continue;
            };
            let text = line.translate_to_string(true, 0, None);
            if text.is_empty() {
                continue;
            }

            let on_cursor_row = row == cursor_y;
            let soft_wrapped = line.is_wrapped()
                || (on_cursor_row
                    && continuation_prompt
                        .is_some_and(|prompt| !has_continuation_prompt(&text, prompt)));
            if soft_wrapped {
                value.push_str(&text);
                cursor_index += if on_cursor_row {
                    relative_cursor_index(line, 0, cursor_x)
                } else {
                    char_len(&text)
                };
            } else if is_fish {
                cursor_index = append_fish_row(&mut value, &text, cursor_index);
            } else if continuation_prompt.map_or(true, |prompt| has_continuation_prompt(&text, prompt)) {
                let stripped = strip_continuation_prompt(&text, continuation_prompt);
                value.push('\n');
                value.push_str(stripped);
                cursor_index += 1 + if on_cursor_row {
                    let prompt_width = continuation_prompt
                        .map_or(0, |prompt| continuation_prompt_cell_width(line, prompt));
                    relative_cursor_index(line, prompt_width, cursor_x)
                } else {
                    trim_end_len(stripped)
                };
            } else {
                tracing::trace!(row, "row without continuation prompt left out of prompt input");
            }
        }

        let bottom = buffer.base_y() + buffer.rows();
        for row in cursor_y.max(start_y) + 1..bottom {
            let Some(line) = buffer.line(row) else {
                break;
            };
            let text = line.translate_to_string(true, 0, None);
            if text.is_empty() {
                break;
            }

            if line.is_wrapped() {
                value.push_str(&text);
            } else if is_fish {
                append_fish_row(&mut value, &text, cursor_index);
            } else if continuation_prompt.map_or(true, |prompt| has_continuation_prompt(&text, prompt)) {
                value.push('\n');
                value.push_str(strip_continuation_prompt(&text, continuation_prompt));
            } else {
                value.push_str(&text);
            }
        }

        let whitespace = reconcile_trailing_whitespace(&WhitespaceContext {
            value: &value,
            cursor_index,
            previous_value: &self.value,
            previous_cursor_index: self.cursor_index,
            user_input: &self.last_user_input,
            continuation_prompt,
        });
        let mut value = whitespace.value;

        let mut ghost_text_index = None;
        if cursor_y >= start_y && !value.trim().is_empty() {
            let line = buffer.line(cursor_y).ok_or_else(|| {
                PromptInputError::Buffer(format!("cursor row {cursor_y} is missing from the buffer"))
            })?;
            ghost_text_index = GhostTextScan {
                line,
                cursor_x,
                cols: buffer.cols(),
                input_start_x: if cursor_y == start_y { start_x } else { 0 },
            }
            .detect(cursor_index);
        }

        if let Some(index) = ghost_text_index {
            if slice_from(&value, index).ends_with(' ') {
                value.truncate(value.trim_end().len());
            }
            if char_len(&value) <= index {
                ghost_text_index = None;
            }
        }

        let len = char_len(&value);
        let cursor_index = cursor_index.min(len);
        let ghost_text_index = ghost_text_index.filter(|index| cursor_index <= *index && *index < len);

        Ok(Some(SyncOutcome {
            value,
            cursor_index,
            ghost_text_index,
            consumed_user_input: whitespace.consumed_user_input,
        }))
    }
}

/// Appends a fish row and returns the advanced cursor index.
///
/// A trailing backslash joins the row onto the previous one, a deep indent
/// starts a new logical line and anything else is a plain continuation.
fn append_fish_row(value: &mut String, text: &str, cursor_index: usize) -> usize {
    let trimmed = text.trim();
    if value.ends_with('\\') {
        value.pop();
        value.push_str(trimmed);
        (cursor_index + char_len(trimmed)).saturating_sub(1)
    } else if leading_spaces(text) >= FISH_NEWLINE_MIN_INDENT {
        value.push('\n');
        value.push_str(trimmed);
        cursor_index + char_len(trimmed) + 1
    } else {
        value.push_str(text);
        cursor_index + char_len(text)
    }
}

fn has_continuation_prompt(text: &str, prompt: &str) -> bool {
    text.starts_with(prompt.trim_end())
}

fn strip_continuation_prompt<'a>(text: &'a str, prompt: Option<&str>) -> &'a str {
    match prompt {
        Some(prompt) if has_continuation_prompt(text, prompt) => slice_from(text, char_len(prompt)),
        _ => text,
    }
}

/// Cells the continuation prompt occupies at the start of `line`.
fn continuation_prompt_cell_width(line: &dyn BufferLine, prompt: &str) -> usize {
    let mut rendered = String::new();
    for col in 0..line.len() {
        let Some(cell) = line.cell(col) else {
            break;
        };
        match cell.chars() {
            "" if cell.width() != 0 => rendered.push(' '),
            chars => rendered.push_str(chars),
        }
        if rendered == prompt {
            return col + 1;
        }
        if rendered.len() >= prompt.len() {
            break;
        }
    }
    UnicodeWidthStr::width(prompt)
}
