//! Port for structured turn logging.
//!
//! Defines the [`ConversationLogger`] trait for recording turn events
//! (received text, call plans, step results, answers) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! turn transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured turn event for logging.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "turn_received", "plan_built", "answer").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging turn events to a structured log.
///
/// Implementations write each event as a single record and stamp it with
/// the time of writing. `log` is synchronous and infallible; failures are
/// dropped by the implementation.
pub trait ConversationLogger: Send + Sync {
    /// Record a turn event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
