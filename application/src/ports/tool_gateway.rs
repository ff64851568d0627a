//! Tool Gateway port
//!
//! Defines the interface for invoking a tool on its tool-server.

use async_trait::async_trait;
use insights_domain::FailureKind;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// One call to a tool-server.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Canonical tool name
    pub tool_name: String,
    /// Tool-server endpoint taken from the tool descriptor
    pub backend_address: String,
    /// Fully resolved and validated arguments
    pub arguments: Map<String, Value>,
    /// Deadline for this call
    pub timeout: Duration,
}

/// Failure class reported by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailureKind {
    /// Network error or 5xx; safe to retry once
    Transient,
    /// No response within the request timeout
    Timeout,
    /// The tool-server rejected the call (4xx-class)
    Domain,
    /// The response could not be understood
    Protocol,
}

impl GatewayFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayFailureKind::Transient => "transient",
            GatewayFailureKind::Timeout => "timeout",
            GatewayFailureKind::Domain => "domain",
            GatewayFailureKind::Protocol => "protocol",
        }
    }
}

impl std::fmt::Display for GatewayFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by [`ToolGateway::invoke`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} failure: {detail}")]
pub struct GatewayFailure {
    pub kind: GatewayFailureKind,
    pub detail: String,
}

impl GatewayFailure {
    pub fn new(kind: GatewayFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        Self::new(GatewayFailureKind::Transient, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(GatewayFailureKind::Timeout, detail)
    }

    pub fn domain(detail: impl Into<String>) -> Self {
        Self::new(GatewayFailureKind::Domain, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(GatewayFailureKind::Protocol, detail)
    }

    /// Map to the failure recorded on the invocation result.
    ///
    /// Unparseable responses are not retried, so they count as domain failures.
    pub fn failure_kind(&self) -> FailureKind {
        match self.kind {
            GatewayFailureKind::Transient => FailureKind::Transient,
            GatewayFailureKind::Timeout => FailureKind::Timeout,
            GatewayFailureKind::Domain | GatewayFailureKind::Protocol => FailureKind::Domain,
        }
    }
}

/// Gateway to the tool-servers
///
/// This port defines how the application layer reaches tool-servers.
/// Implementations (adapters) live in the infrastructure layer. Calls must be
/// safe to repeat once: the dispatcher retries transient failures.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Invoke one tool and return its payload.
    async fn invoke(&self, request: &InvocationRequest) -> Result<Value, GatewayFailure>;
}
