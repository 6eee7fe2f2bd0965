use std::time::Duration;

use prompt_input_protocol::event::PromptInputEvent;
use prompt_input_protocol::ids::PromptSessionId;

/// An event as delivered to subscribers of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInputEventEnvelope {
    pub session_id: PromptSessionId,
    /// Position within the session, starting at 1.
    pub sequence: u64,
    /// Time since the bus was created.
    pub published_at: Duration,
    pub event: PromptInputEvent,
}
