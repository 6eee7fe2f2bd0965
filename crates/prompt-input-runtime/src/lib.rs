//! Drives a [`prompt_input_model::PromptInputModel`] from live terminal
//! output.
//!
//! [`TerminalEmulator`] turns bytes into a screen the model can read and
//! [`PromptInputSession`] serialises every mutation through one tokio task.

mod session;
mod terminal_emulator;

pub use session::{PromptInputSession, PromptInputSessionHandle};
pub use terminal_emulator::TerminalEmulator;
