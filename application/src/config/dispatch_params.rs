//! Dispatch parameters — plan execution control.
//!
//! [`DispatchParams`] groups the static parameters that control the
//! dispatch loop in [`DispatchPlanUseCase`](crate::use_cases::dispatch_plan::DispatchPlanUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatch loop control parameters.
///
/// Bounds concurrency and latency of one call plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Maximum simultaneous gateway calls across the whole plan.
    pub max_in_flight: usize,
    /// Deadline for a single gateway call.
    pub step_timeout: Duration,
    /// Deadline for the whole plan, retries included.
    pub plan_timeout: Duration,
    /// Fixed wait before the single retry of a transient failure.
    pub retry_backoff: Duration,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            step_timeout: Duration::from_secs(30),
            plan_timeout: Duration::from_secs(60),
            retry_backoff: Duration::from_millis(250),
        }
    }
}

impl DispatchParams {
    // ==================== Builder Methods ====================

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_plan_timeout(mut self, timeout: Duration) -> Self {
        self.plan_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}
