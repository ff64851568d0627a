//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Only [`DomainError::Configuration`] is fatal for a turn: it signals a
/// programming error in plan construction (cycles, dangling references)
/// rather than a user or tool-server problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Whether this error must abort the turn and raise an alert.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DomainError::Configuration(_))
    }
}
