use prompt_input_protocol::buffer::BufferLine;

pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub(crate) fn trim_end_len(value: &str) -> usize {
    char_len(value.trim_end())
}

pub(crate) fn char_at(value: &str, index: usize) -> Option<char> {
    value.chars().nth(index)
}

/// Suffix starting at char `start`; empty when `start` is past the end.
pub(crate) fn slice_from(value: &str, start: usize) -> &str {
    value
        .char_indices()
        .nth(start)
        .map_or("", |(offset, _)| &value[offset..])
}

pub(crate) fn truncate_chars(value: &mut String, len: usize) {
    if let Some((offset, _)) = value.char_indices().nth(len) {
        value.truncate(offset);
    }
}

pub(crate) fn leading_spaces(value: &str) -> usize {
    value.chars().take_while(|ch| *ch == ' ').count()
}

/// Chars rendered between `start_col` and the cursor column on `line`.
pub(crate) fn relative_cursor_index(
    line: &dyn BufferLine,
    start_col: usize,
    cursor_x: usize,
) -> usize {
    if start_col >= cursor_x {
        return 0;
    }
    char_len(&line.translate_to_string(false, start_col, Some(cursor_x)))
}
