use serde::{Deserialize, Serialize};

/// Marker rendered in place of `\n` by [`PromptInputSnapshot::combined_string`].
pub const COMBINED_NEWLINE_MARKER: char = '\u{23CE}';

/// Immutable view of the reconstructed prompt input.
///
/// Indices count Unicode scalar values, not bytes. `None` means the index does
/// not apply: no cursor once a command is executing, no inline suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptInputSnapshot {
    pub value: String,
    pub cursor_index: Option<usize>,
    pub ghost_text_index: Option<usize>,
}

impl PromptInputSnapshot {
    pub fn new(
        value: impl Into<String>,
        cursor_index: Option<usize>,
        ghost_text_index: Option<usize>,
    ) -> Self {
        Self {
            value: value.into(),
            cursor_index,
            ghost_text_index,
        }
    }

    /// Text left of the cursor. Empty when the cursor does not apply.
    pub fn prefix(&self) -> &str {
        slice_chars(&self.value, 0, Some(self.cursor_index.unwrap_or(0)))
    }

    /// Text from the cursor up to the inline suggestion, or to the end.
    pub fn suffix(&self) -> &str {
        slice_chars(
            &self.value,
            self.cursor_index.unwrap_or(0),
            self.ghost_text_index,
        )
    }

    /// Debug rendering: `|` marks the cursor, `[...]` wraps ghost text and
    /// newlines are shown as `⏎`.
    pub fn combined_string(&self, empty_string_when_empty: bool) -> String {
        let value = self
            .value
            .replace('\n', &COMBINED_NEWLINE_MARKER.to_string());
        let Some(cursor_index) = self.cursor_index else {
            return value;
        };

        let mut result = String::with_capacity(value.len() + 3);
        result.push_str(slice_chars(&value, 0, Some(cursor_index)));
        result.push('|');
        match self.ghost_text_index {
            Some(ghost_text_index) => {
                result.push_str(slice_chars(&value, cursor_index, Some(ghost_text_index)));
                result.push('[');
                result.push_str(slice_chars(&value, ghost_text_index, None));
                result.push(']');
            }
            None => result.push_str(slice_chars(&value, cursor_index, None)),
        }

        if empty_string_when_empty && result == "|" {
            return String::new();
        }
        result
    }
}

/// Passive projection of a model, enough to resume after a reload without
/// reading the terminal buffer again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedPromptInput {
    pub snapshot: PromptInputSnapshot,
    pub command_start_x: usize,
    #[serde(default)]
    pub last_prompt_line: Option<String>,
    #[serde(default)]
    pub continuation_prompt: Option<String>,
    #[serde(default)]
    pub last_user_input: String,
}

fn slice_chars(value: &str, start: usize, end: Option<usize>) -> &str {
    let byte_at = |index: usize| {
        value
            .char_indices()
            .nth(index)
            .map_or(value.len(), |(offset, _)| offset)
    };
    let start_byte = byte_at(start);
    let end_byte = end.map_or(value.len(), byte_at).max(start_byte);
    &value[start_byte..end_byte]
}
