//! Session conversational context.

pub mod entities;

pub use entities::{DEFAULT_HISTORY_LIMIT, PendingClarification, SessionContext, TurnRecord};
