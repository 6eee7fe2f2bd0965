use async_trait::async_trait;

use crate::error::PromptInputResult;
use crate::event::PromptInputEvent;

#[async_trait]
pub trait PromptInputEventSubscription: Send {
    /// Next event, or `None` once the source has closed.
    async fn next_event(&mut self) -> PromptInputResult<Option<PromptInputEvent>>;
}

pub type PromptInputEventStream = Box<dyn PromptInputEventSubscription>;
