//! Progress notification port
//!
//! Defines the interface for reporting progress while a call plan runs.

use insights_domain::{CallPlan, FailureKind, StepId, ToolInvocationResult};

/// Callback for progress updates during plan dispatch
///
/// Implementations live in the presentation layer. All callbacks are invoked
/// from the dispatcher's coordinating task, never from worker tasks.
pub trait DispatchProgressNotifier: Send + Sync {
    /// Called once the plan has been validated
    fn on_plan_start(&self, _plan: &CallPlan) {}

    /// Called when a call is handed to the gateway
    fn on_step_start(&self, _step: StepId, _tool_name: &str, _attempt: u32) {}

    /// Called when a failed call is scheduled for its retry
    fn on_step_retry(&self, _step: StepId, _tool_name: &str, _kind: FailureKind) {}

    /// Called when a step has its final result
    fn on_step_complete(&self, _result: &ToolInvocationResult) {}

    /// Called after every step has a result
    fn on_plan_complete(&self, _results: &[ToolInvocationResult]) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DispatchProgressNotifier for NoProgress {}
