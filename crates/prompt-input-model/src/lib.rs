//! Reconstructs the command line a user is typing from a styled terminal grid.
//!
//! [`PromptInputModel`] is driven by shell integration signals and buffer
//! change notifications; it reads the buffer through
//! [`prompt_input_protocol::TerminalBuffer`] and queues
//! [`prompt_input_protocol::PromptInputEvent`]s for its owner to publish.

mod ghost_text;
mod model;
mod sync;
mod text;
mod whitespace;

#[cfg(test)]
mod test_support;

pub use model::PromptInputModel;

/// Blank cells between input and a styled run that mark it as a right prompt.
pub const RIGHT_PROMPT_MIN_BLANK_CELLS: usize = 5;

/// Leading spaces after which a fish row is read as a new logical line.
pub const FISH_NEWLINE_MIN_INDENT: usize = 6;

pub const INTERRUPT_INPUT: &str = "\u{3}";
pub const BACKSPACE_INPUT: &str = "\u{7f}";
pub const DELETE_INPUT: &str = "\u{1b}[3~";
pub const SPACE_INPUT: &str = " ";
