use async_trait::async_trait;
use prompt_input_protocol::error::PromptInputResult;
use prompt_input_protocol::event::PromptInputEvent;
use prompt_input_protocol::stream::PromptInputEventSubscription;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::envelope::PromptInputEventEnvelope;

/// Receiver that skips over lag instead of failing the consumer.
pub struct PromptInputEnvelopeSubscription {
    receiver: broadcast::Receiver<PromptInputEventEnvelope>,
    skipped: u64,
}

impl PromptInputEnvelopeSubscription {
    pub fn new(receiver: broadcast::Receiver<PromptInputEventEnvelope>) -> Self {
        Self {
            receiver,
            skipped: 0,
        }
    }

    /// Events dropped because this subscriber fell behind.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub async fn next_envelope(&mut self) -> Option<PromptInputEventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(skipped)) => {
                    self.skipped = self.skipped.saturating_add(skipped);
                    tracing::warn!(skipped, "prompt input subscriber lagged behind the event bus");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
impl PromptInputEventSubscription for PromptInputEnvelopeSubscription {
    async fn next_event(&mut self) -> PromptInputResult<Option<PromptInputEvent>> {
        Ok(self.next_envelope().await.map(|envelope| envelope.event))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use prompt_input_protocol::event::PromptInputEvent;
    use prompt_input_protocol::ids::PromptSessionId;
    use prompt_input_protocol::snapshot::PromptInputSnapshot;
    use prompt_input_protocol::stream::{PromptInputEventStream, PromptInputEventSubscription};
    use tokio::time::timeout;

    use crate::bus::PromptInputEventBus;

    const TEST_TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn stream_yields_events_then_none_after_session_removal() {
        let bus = PromptInputEventBus::default();
        let session_id = PromptSessionId::new("sess-a");
        let mut stream: PromptInputEventStream = Box::new(bus.session_stream(session_id.clone()));

        bus.publish(
            &session_id,
            PromptInputEvent::StartInput(PromptInputSnapshot::default()),
        );
        let event = timeout(TEST_TIMEOUT, stream.next_event())
            .await
            .expect("stream recv timed out")
            .expect("stream recv should succeed");
        assert!(matches!(event, Some(PromptInputEvent::StartInput(_))));

        bus.remove_session(&session_id);
        let closed = timeout(TEST_TIMEOUT, stream.next_event())
            .await
            .expect("stream recv timed out")
            .expect("stream recv should succeed");
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn lagged_subscription_resumes_with_newest_events() {
        let bus = PromptInputEventBus::with_capacity(2);
        let session_id = PromptSessionId::new("sess-a");
        let mut subscription = bus.session_stream(session_id.clone());

        for index in 0..6 {
            bus.publish(
                &session_id,
                PromptInputEvent::ChangeInput(PromptInputSnapshot::new(
                    index.to_string(),
                    Some(1),
                    None,
                )),
            );
        }

        let envelope = timeout(TEST_TIMEOUT, subscription.next_envelope())
            .await
            .expect("subscription recv timed out")
            .expect("subscription should stay open");
        assert_eq!(envelope.event.snapshot().value, "4");
        assert_eq!(subscription.skipped(), 4);
    }
}
