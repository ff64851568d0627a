//! Tool domain value objects: invocation outcomes
//!
//! Every dispatched (or deliberately skipped) plan step produces exactly one
//! final [`ToolInvocationResult`]. Results are write-once: the fields are
//! private and there are no setters, so a retry produces a new result that
//! supersedes the earlier attempt instead of patching it.

use crate::plan::StepId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why a step did not produce a payload.
///
/// | Kind | Retried? | Gateway called? |
/// |------|----------|-----------------|
/// | `MissingParameter` | No | No |
/// | `InvalidParameter` | No | No |
/// | `DependencyFailed` | No | No |
/// | `Transient` | Once | Yes |
/// | `Timeout` | Once | Yes |
/// | `Domain` | No | Yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required parameter could not be resolved
    MissingParameter,
    /// A bound value failed schema validation
    InvalidParameter,
    /// An upstream step in the same plan failed
    DependencyFailed,
    /// Network or 5xx-class failure
    Transient,
    /// The per-step timeout or plan deadline elapsed
    Timeout,
    /// The tool-server rejected the request (4xx-class)
    Domain,
}

impl FailureKind {
    /// Only network-class failures get the single retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Transient | FailureKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingParameter => "missing_parameter",
            FailureKind::InvalidParameter => "invalid_parameter",
            FailureKind::DependencyFailed => "dependency_failed",
            FailureKind::Transient => "transient",
            FailureKind::Timeout => "timeout",
            FailureKind::Domain => "domain",
        }
    }

    /// Short phrase used in degraded-mode notices.
    pub fn describe(&self) -> &'static str {
        match self {
            FailureKind::MissingParameter => "a required parameter is missing",
            FailureKind::InvalidParameter => "a parameter value was invalid",
            FailureKind::DependencyFailed => "the data it depends on was unavailable",
            FailureKind::Transient => "the service was temporarily unreachable",
            FailureKind::Timeout => "the request timed out",
            FailureKind::Domain => "the service rejected the request",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    Failure(FailureKind),
}

impl InvocationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationStatus::Success)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            InvocationStatus::Success => None,
            InvocationStatus::Failure(kind) => Some(*kind),
        }
    }
}

/// Outcome of one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    step_id: StepId,
    tool_name: String,
    status: InvocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
    /// Parameters that blocked dispatch (only for `MissingParameter`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    missing_parameters: Vec<String>,
    /// Arguments actually sent (or that would have been sent)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    arguments: Map<String, Value>,
    latency_ms: u64,
    attempt: u32,
}

impl ToolInvocationResult {
    pub fn success(step_id: StepId, tool_name: impl Into<String>, payload: Value, latency_ms: u64) -> Self {
        Self {
            step_id,
            tool_name: tool_name.into(),
            status: InvocationStatus::Success,
            payload: Some(payload),
            error_detail: None,
            missing_parameters: Vec::new(),
            arguments: Map::new(),
            latency_ms,
            attempt: 1,
        }
    }

    pub fn failure(
        step_id: StepId,
        tool_name: impl Into<String>,
        kind: FailureKind,
        detail: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            step_id,
            tool_name: tool_name.into(),
            status: InvocationStatus::Failure(kind),
            payload: None,
            error_detail: Some(detail.into()),
            missing_parameters: Vec::new(),
            arguments: Map::new(),
            latency_ms,
            attempt: 1,
        }
    }

    /// A step blocked on unresolved required parameters. Never dispatched.
    pub fn missing_parameters(step_id: StepId, tool_name: impl Into<String>, params: Vec<String>) -> Self {
        let tool_name = tool_name.into();
        let detail = format!("missing required parameter(s): {}", params.join(", "));
        Self {
            missing_parameters: params,
            ..Self::failure(step_id, tool_name, FailureKind::MissingParameter, detail, 0)
        }
    }

    pub fn dependency_failed(step_id: StepId, tool_name: impl Into<String>, upstream: StepId) -> Self {
        Self::failure(
            step_id,
            tool_name,
            FailureKind::DependencyFailed,
            format!("upstream step {} did not succeed", upstream),
            0,
        )
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn status(&self) -> InvocationStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.status.failure_kind()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn missing(&self) -> &[String] {
        &self.missing_parameters
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    /// 1 for a first attempt, 2 after the retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
