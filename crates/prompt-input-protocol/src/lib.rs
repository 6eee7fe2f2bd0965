//! Shared vocabulary for prompt input reconciliation: identifiers, state,
//! snapshots, events and the read-only terminal buffer interface.

pub mod buffer;
pub mod error;
pub mod event;
pub mod grid;
pub mod ids;
pub mod snapshot;
pub mod state;
pub mod stream;

pub use buffer::{BufferCell, BufferLine, CellColor, CellStyle, TerminalBuffer};
pub use error::{PromptInputError, PromptInputResult};
pub use event::{PromptInputEvent, PromptInputEventKind};
pub use grid::{GridBuffer, GridCell, GridLine};
pub use ids::{LineMarker, PromptSessionId};
pub use snapshot::{PromptInputSnapshot, SerializedPromptInput, COMBINED_NEWLINE_MARKER};
pub use state::{PromptInputState, ShellType};
pub use stream::{PromptInputEventStream, PromptInputEventSubscription};
