use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use prompt_input_protocol::event::PromptInputEvent;
use prompt_input_protocol::ids::PromptSessionId;
use tokio::sync::broadcast;

use crate::envelope::PromptInputEventEnvelope;
use crate::subscription::PromptInputEnvelopeSubscription;

/// Envelopes a subscriber may fall behind by before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// One broadcast channel per prompt input session.
///
/// Envelopes are numbered per session starting at 1, so a subscriber can tell
/// from a gap that it missed a change. Numbering advances whether or not
/// anyone is subscribed; a removed session starts over.
#[derive(Debug)]
pub struct PromptInputEventBus {
    started_at: Instant,
    capacity: usize,
    sessions: Mutex<HashMap<PromptSessionId, SessionChannel>>,
}

#[derive(Debug)]
struct SessionChannel {
    sender: broadcast::Sender<PromptInputEventEnvelope>,
    published: u64,
}

impl SessionChannel {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            published: 0,
        }
    }

    fn publish(
        &mut self,
        session_id: &PromptSessionId,
        published_at: Duration,
        event: PromptInputEvent,
    ) -> PromptInputEventEnvelope {
        self.published = self.published.saturating_add(1);
        let envelope = PromptInputEventEnvelope {
            session_id: session_id.clone(),
            sequence: self.published,
            published_at,
            event,
        };
        // Sending only fails when nobody is listening.
        let _ = self.sender.send(envelope.clone());
        envelope
    }
}

impl Default for PromptInputEventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl PromptInputEventBus {
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            started_at: Instant::now(),
            capacity: capacity.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe_session(
        &self,
        session_id: PromptSessionId,
    ) -> broadcast::Receiver<PromptInputEventEnvelope> {
        self.sessions()
            .entry(session_id)
            .or_insert_with(|| SessionChannel::new(self.capacity))
            .sender
            .subscribe()
    }

    /// Session subscription wrapped as an event stream.
    pub fn session_stream(&self, session_id: PromptSessionId) -> PromptInputEnvelopeSubscription {
        PromptInputEnvelopeSubscription::new(self.subscribe_session(session_id))
    }

    /// Drops the session channel. Its subscribers drain what was already sent
    /// and then see the stream close.
    pub fn remove_session(&self, session_id: &PromptSessionId) -> bool {
        self.sessions().remove(session_id).is_some()
    }

    pub fn publish(
        &self,
        session_id: &PromptSessionId,
        event: PromptInputEvent,
    ) -> PromptInputEventEnvelope {
        let published_at = self.started_at.elapsed();
        self.sessions()
            .entry(session_id.clone())
            .or_insert_with(|| SessionChannel::new(self.capacity))
            .publish(session_id, published_at, event)
    }

    /// Publishes events under consecutive sequence numbers, in order.
    pub fn publish_all(
        &self,
        session_id: &PromptSessionId,
        events: impl IntoIterator<Item = PromptInputEvent>,
    ) -> Vec<PromptInputEventEnvelope> {
        let mut sessions = self.sessions();
        let channel = sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionChannel::new(self.capacity));
        let envelopes = events
            .into_iter()
            .map(|event| channel.publish(session_id, self.started_at.elapsed(), event))
            .collect();
        envelopes
    }

    // A panic elsewhere cannot leave a channel half updated.
    fn sessions(&self) -> MutexGuard<'_, HashMap<PromptSessionId, SessionChannel>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
