//! Ordered per-session fan-out of prompt input events.

pub mod bus;
pub mod envelope;
pub mod subscription;

pub use bus::{PromptInputEventBus, DEFAULT_EVENT_CAPACITY};
pub use envelope::PromptInputEventEnvelope;
pub use subscription::PromptInputEnvelopeSubscription;
