//! Replays recorded terminal sessions through the prompt input engine.

mod cli;
mod logging;
mod replay;

pub use cli::{parse_cli_flags, print_cli_help, CliFlags};
pub use logging::init_logging;
pub use replay::{format_event, parse_recording, replay, ReplayOp};
