//! Coalescing scheduler for reconciliation passes.

pub mod throttle;

pub use throttle::{SyncDecision, SyncThrottle, DEFAULT_SYNC_INTERVAL};
