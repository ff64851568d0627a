//! Logging infrastructure: structured turn transcripts.
//!
//! Provides [`JsonlTurnLogger`], a JSONL file writer that implements
//! the [`ConversationLogger`](insights_application::ports::conversation_logger::ConversationLogger) port.

mod jsonl_turn_logger;

pub use jsonl_turn_logger::JsonlTurnLogger;
