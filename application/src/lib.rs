//! Application layer for exec-insights
//!
//! This crate contains use cases, port definitions, application configuration
//! and the session store. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod session_store;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{DispatchParams, SessionParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    progress::{DispatchProgressNotifier, NoProgress},
    tool_gateway::{GatewayFailure, GatewayFailureKind, InvocationRequest, ToolGateway},
};
pub use session_store::{SessionStore, SessionStoreError, TurnTicket};
pub use use_cases::dispatch_plan::{
    DispatchError, DispatchOutcome, DispatchPlanInput, DispatchPlanUseCase,
};
pub use use_cases::handle_turn::{HandleTurnError, HandleTurnUseCase};
