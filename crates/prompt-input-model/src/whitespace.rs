//! Trailing whitespace is invisible in the grid: an erased cell and a typed
//! space render the same once the shell redraws. The previous snapshot and the
//! last raw input are used to keep track of how many trailing spaces the user
//! actually typed.

use crate::text::{char_at, char_len, trim_end_len};
use crate::{BACKSPACE_INPUT, DELETE_INPUT, SPACE_INPUT};

pub(crate) struct WhitespaceContext<'a> {
    /// Value as read from the buffer.
    pub(crate) value: &'a str,
    pub(crate) cursor_index: usize,
    pub(crate) previous_value: &'a str,
    pub(crate) previous_cursor_index: Option<usize>,
    pub(crate) user_input: &'a str,
    pub(crate) continuation_prompt: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WhitespaceOutcome {
    pub(crate) value: String,
    pub(crate) consumed_user_input: bool,
}

pub(crate) fn reconcile_trailing_whitespace(context: &WhitespaceContext<'_>) -> WhitespaceOutcome {
    let value = context.value;
    let cursor = context.cursor_index;
    let len = char_len(value);
    let trimmed = trim_end_len(value);
    let previous_len = char_len(context.previous_value);
    let previous_trimmed = trim_end_len(context.previous_value);
    let previous_cursor = context.previous_cursor_index;

    let mut input = context.user_input;
    let mut consumed_user_input = false;
    let mut trailing = previous_len.saturating_sub(previous_trimmed);

    if input == BACKSPACE_INPUT {
        input = "";
        consumed_user_input = true;
        if previous_cursor == Some(cursor + 1) {
            if previous_trimmed > trimmed && trimmed <= cursor {
                trailing = previous_len.saturating_sub(1).saturating_sub(trimmed);
            } else {
                trailing = trailing.saturating_sub(1);
            }
        }
    }

    if input == DELETE_INPUT {
        input = "";
        consumed_user_input = true;
        if previous_cursor == Some(cursor) {
            trailing = trailing.saturating_sub(1);
        }
    }

    let lines = value.split('\n').collect::<Vec<_>>();
    if lines.len() == 1 {
        if trimmed < len {
            if input == SPACE_INPUT {
                input = "";
                consumed_user_input = true;
                if cursor > trimmed && previous_cursor.map_or(true, |previous| cursor > previous) {
                    trailing += 1;
                }
            }
            trailing = trailing.max(cursor.saturating_sub(trimmed));
        }

        // A printable char typed inside the trailing run only shifts it.
        if trailing > 0
            && previous_cursor.is_some_and(|previous| previous + 1 == cursor)
            && !input.is_empty()
            && cursor
                .checked_sub(1)
                .and_then(|index| char_at(value, index))
                .is_some_and(|ch| ch != ' ')
        {
            if let Some(previous) = previous_cursor {
                trailing = previous_len.saturating_sub(previous);
            }
        }
    } else {
        let prompt_len = context.continuation_prompt.map_or(0, char_len);
        trailing = cursor.saturating_sub(len + (lines.len() - 1) * prompt_len);
    }

    let mut reconciled = lines
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    reconciled.extend(std::iter::repeat(' ').take(trailing));

    WhitespaceOutcome {
        value: reconciled,
        consumed_user_input,
    }
}
