//! Dispatch Plan use case
//!
//! Executes a [`CallPlan`] against the tool gateway.
//!
//! Steps run as soon as every dependency has a result, up to
//! `max_in_flight` at a time; surplus ready steps wait in a FIFO queue in
//! topological (then declaration) order. A failed branch never stops
//! independent branches: every step ends with a result.

use crate::config::DispatchParams;
use crate::ports::progress::{DispatchProgressNotifier, NoProgress};
use crate::ports::tool_gateway::{GatewayFailure, InvocationRequest, ToolGateway};
use indexmap::IndexMap;
use insights_domain::{
    CallPlan, DomainError, FailureKind, ParameterResolver, Resolution, StepId, ToolInvocationResult,
    ToolRegistry, topological_order,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// First attempt plus one retry.
const MAX_ATTEMPTS: u32 = 2;

/// Errors that abort a dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The plan itself is malformed; no call was made
    #[error(transparent)]
    InvalidPlan(#[from] DomainError),

    #[error("Dispatch cancelled")]
    Cancelled,
}

/// Input for the DispatchPlan use case
#[derive(Debug, Clone, Default)]
pub struct DispatchPlanInput {
    pub plan: CallPlan,
    /// Sticky values inherited from the session
    pub session_defaults: IndexMap<String, Value>,
    pub cancellation: Option<CancellationToken>,
}

impl DispatchPlanInput {
    pub fn new(plan: CallPlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    pub fn with_session_defaults(mut self, defaults: IndexMap<String, Value>) -> Self {
        self.session_defaults = defaults;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Results of a dispatched plan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchOutcome {
    /// One result per step, in declaration order
    pub results: Vec<ToolInvocationResult>,
    /// Explicit sticky values to write back to the session
    pub sticky_updates: IndexMap<String, Value>,
}

/// What a worker task reports back.
struct AttemptOutcome {
    step: StepId,
    attempt: u32,
    request: InvocationRequest,
    latency_ms: u64,
    outcome: Result<Value, GatewayFailure>,
}

/// Mutable bookkeeping for one dispatch.
struct DispatchState<'a> {
    plan: &'a CallPlan,
    /// Steps whose dependencies are not all finished, in topological order
    waiting: Vec<StepId>,
    ready: VecDeque<StepId>,
    results: HashMap<StepId, ToolInvocationResult>,
    sticky_updates: IndexMap<String, Value>,
    in_flight: JoinSet<AttemptOutcome>,
    tasks: HashMap<tokio::task::Id, StepId>,
}

impl DispatchState<'_> {
    fn record(&mut self, result: ToolInvocationResult, progress: &dyn DispatchProgressNotifier) {
        debug!(
            "Step {} ({}) finished: {:?}",
            result.step_id(),
            result.tool_name(),
            result.status()
        );
        progress.on_step_complete(&result);
        self.results.insert(result.step_id(), result);
    }

    /// Upstream payloads visible to `step`.
    fn upstream_payloads(&self, step: StepId) -> HashMap<StepId, Value> {
        self.plan
            .step(step)
            .map(|s| {
                s.depends_on
                    .iter()
                    .filter_map(|dep| {
                        let payload = self.results.get(dep)?.payload()?;
                        Some((*dep, payload.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Use case for running a call plan (the Dispatcher)
pub struct DispatchPlanUseCase {
    gateway: Arc<dyn ToolGateway>,
    registry: Arc<ToolRegistry>,
    resolver: ParameterResolver,
    params: DispatchParams,
}

impl DispatchPlanUseCase {
    pub fn new(gateway: Arc<dyn ToolGateway>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            gateway,
            registry,
            resolver: ParameterResolver::new(),
            params: DispatchParams::default(),
        }
    }

    pub fn with_params(mut self, params: DispatchParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: DispatchPlanInput) -> Result<DispatchOutcome, DispatchError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: DispatchPlanInput,
        progress: &dyn DispatchProgressNotifier,
    ) -> Result<DispatchOutcome, DispatchError> {
        let plan = &input.plan;
        // Validate everything before the first call
        let order = topological_order(plan)?;
        for step in &plan.steps {
            self.registry
                .lookup(&step.tool_name)
                .map_err(|e| DomainError::Configuration(format!("step {}: {}", step.id, e)))?;
        }

        info!(
            "Dispatching plan with {} step(s): {}",
            plan.len(),
            plan.tool_names().join(", ")
        );
        progress.on_plan_start(plan);

        let cancellation = input.cancellation.clone().unwrap_or_default();
        let deadline = Instant::now() + self.params.plan_timeout;
        let plan_deadline = tokio::time::sleep_until(deadline);
        tokio::pin!(plan_deadline);

        let mut state = DispatchState {
            plan,
            waiting: order,
            ready: VecDeque::new(),
            results: HashMap::new(),
            sticky_updates: IndexMap::new(),
            in_flight: JoinSet::new(),
            tasks: HashMap::new(),
        };

        loop {
            if cancellation.is_cancelled() {
                state.in_flight.abort_all();
                return Err(DispatchError::Cancelled);
            }

            self.schedule(&mut state, &input.session_defaults, progress);
            if state.in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!("Plan dispatch cancelled with {} call(s) in flight", state.in_flight.len());
                    state.in_flight.abort_all();
                    return Err(DispatchError::Cancelled);
                }
                _ = &mut plan_deadline => {
                    warn!(
                        "Plan deadline of {} ms reached with {} call(s) in flight",
                        self.params.plan_timeout.as_millis(),
                        state.in_flight.len()
                    );
                    state.in_flight.abort_all();
                    break;
                }
                Some(joined) = state.in_flight.join_next_with_id() => {
                    self.handle_joined(&mut state, joined, progress);
                }
            }
        }

        // Anything still unfinished ran out of plan time
        for step in &plan.steps {
            if !state.results.contains_key(&step.id) {
                let result = ToolInvocationResult::failure(
                    step.id,
                    step.tool_name.clone(),
                    FailureKind::Timeout,
                    format!(
                        "plan deadline of {} ms exceeded",
                        self.params.plan_timeout.as_millis()
                    ),
                    0,
                );
                state.record(result, progress);
            }
        }

        let mut results_by_step = state.results;
        let results: Vec<ToolInvocationResult> = plan
            .steps
            .iter()
            .filter_map(|step| results_by_step.remove(&step.id))
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Plan finished: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );
        progress.on_plan_complete(&results);

        Ok(DispatchOutcome {
            results,
            sticky_updates: state.sticky_updates,
        })
    }

    /// Move finished-dependency steps to the ready queue and start calls
    /// until the concurrency bound is hit or nothing is ready.
    fn schedule(
        &self,
        state: &mut DispatchState<'_>,
        session_defaults: &IndexMap<String, Value>,
        progress: &dyn DispatchProgressNotifier,
    ) {
        let plan = state.plan;
        loop {
            let mut progressed = false;

            let mut index = 0;
            while index < state.waiting.len() {
                let id = state.waiting[index];
                let Some(step) = plan.step(id) else {
                    state.waiting.remove(index);
                    continue;
                };
                if !step.depends_on.iter().all(|dep| state.results.contains_key(dep)) {
                    index += 1;
                    continue;
                }
                state.waiting.remove(index);
                progressed = true;

                let failed_dependency = step
                    .depends_on
                    .iter()
                    .find(|dep| state.results.get(dep).is_some_and(|r| !r.is_success()));
                match failed_dependency {
                    Some(upstream) => {
                        debug!("Step {} skipped: dependency {} failed", id, upstream);
                        let result =
                            ToolInvocationResult::dependency_failed(id, step.tool_name.clone(), *upstream);
                        state.record(result, progress);
                    }
                    None => state.ready.push_back(id),
                }
            }

            while state.in_flight.len() < self.params.max_in_flight {
                let Some(id) = state.ready.pop_front() else {
                    break;
                };
                progressed = true;
                self.start_step(state, id, session_defaults, progress);
            }

            if !progressed {
                break;
            }
        }
    }

    fn start_step(
        &self,
        state: &mut DispatchState<'_>,
        id: StepId,
        session_defaults: &IndexMap<String, Value>,
        progress: &dyn DispatchProgressNotifier,
    ) {
        let plan = state.plan;
        let Some(step) = plan.step(id) else {
            return;
        };
        let descriptor = match self.registry.lookup(&step.tool_name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let result = ToolInvocationResult::failure(
                    id,
                    step.tool_name.clone(),
                    FailureKind::Domain,
                    e.to_string(),
                    0,
                );
                state.record(result, progress);
                return;
            }
        };

        let upstream = state.upstream_payloads(id);
        match self
            .resolver
            .resolve(descriptor, step, session_defaults, &upstream)
        {
            Resolution::Ready(resolved) => {
                for (name, value) in resolved.sticky_updates {
                    state.sticky_updates.insert(name, value);
                }
                let request = InvocationRequest {
                    tool_name: descriptor.name.clone(),
                    backend_address: descriptor.backend_address.clone(),
                    arguments: resolved.arguments,
                    timeout: self.params.step_timeout,
                };
                progress.on_step_start(id, &descriptor.name, 1);
                self.spawn_attempt(state, id, request, 1);
            }
            Resolution::Missing(missing) => {
                debug!(
                    "Step {} ({}) not dispatched, missing: {}",
                    id,
                    descriptor.name,
                    missing.join(", ")
                );
                let result =
                    ToolInvocationResult::missing_parameters(id, descriptor.name.clone(), missing);
                state.record(result, progress);
            }
            Resolution::Invalid(errors) => {
                debug!("Step {} ({}) has invalid arguments", id, descriptor.name);
                let result = ToolInvocationResult::failure(
                    id,
                    descriptor.name.clone(),
                    FailureKind::InvalidParameter,
                    errors.join("; "),
                    0,
                );
                state.record(result, progress);
            }
        }
    }

    fn spawn_attempt(
        &self,
        state: &mut DispatchState<'_>,
        step: StepId,
        request: InvocationRequest,
        attempt: u32,
    ) {
        let gateway = Arc::clone(&self.gateway);
        let backoff = if attempt > 1 {
            self.params.retry_backoff
        } else {
            std::time::Duration::ZERO
        };

        let handle = state.in_flight.spawn(async move {
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            let started = Instant::now();
            let outcome = match tokio::time::timeout(request.timeout, gateway.invoke(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GatewayFailure::timeout(format!(
                    "no response within {} ms",
                    request.timeout.as_millis()
                ))),
            };
            AttemptOutcome {
                step,
                attempt,
                latency_ms: started.elapsed().as_millis() as u64,
                request,
                outcome,
            }
        });
        state.tasks.insert(handle.id(), step);
    }

    fn handle_joined(
        &self,
        state: &mut DispatchState<'_>,
        joined: Result<(tokio::task::Id, AttemptOutcome), tokio::task::JoinError>,
        progress: &dyn DispatchProgressNotifier,
    ) {
        let plan = state.plan;
        let attempt = match joined {
            Ok((task_id, attempt)) => {
                state.tasks.remove(&task_id);
                attempt
            }
            Err(join_error) => {
                warn!("Task join error: {}", join_error);
                if let Some(step) = state.tasks.remove(&join_error.id())
                    && let Some(plan_step) = plan.step(step)
                {
                    let result = ToolInvocationResult::failure(
                        step,
                        plan_step.tool_name.clone(),
                        FailureKind::Domain,
                        format!("tool call aborted: {}", join_error),
                        0,
                    );
                    state.record(result, progress);
                }
                return;
            }
        };

        let AttemptOutcome {
            step,
            attempt,
            request,
            latency_ms,
            outcome,
        } = attempt;

        match outcome {
            Ok(payload) => {
                let result = ToolInvocationResult::success(step, request.tool_name.clone(), payload, latency_ms)
                    .with_arguments(request.arguments)
                    .with_attempt(attempt);
                state.record(result, progress);
            }
            Err(failure) if failure.failure_kind().is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!(
                    "Step {} ({}) failed on attempt {}: {}; retrying in {} ms",
                    step,
                    request.tool_name,
                    attempt,
                    failure,
                    self.params.retry_backoff.as_millis()
                );
                progress.on_step_retry(step, &request.tool_name, failure.failure_kind());
                progress.on_step_start(step, &request.tool_name, attempt + 1);
                self.spawn_attempt(state, step, request, attempt + 1);
            }
            Err(failure) => {
                warn!(
                    "Step {} ({}) failed: {}",
                    step, request.tool_name, failure
                );
                let result = ToolInvocationResult::failure(
                    step,
                    request.tool_name.clone(),
                    failure.failure_kind(),
                    failure.detail,
                    latency_ms,
                )
                .with_arguments(request.arguments)
                .with_attempt(attempt);
                state.record(result, progress);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_gateway::GatewayFailureKind;
    use crate::test_support::{Reply, ScriptedGateway, registry};
    use insights_domain::{CallPlanStep, NarrativeStyle, synthesize};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn dispatcher(gateway: &Arc<ScriptedGateway>, params: DispatchParams) -> DispatchPlanUseCase {
        let gateway: Arc<dyn ToolGateway> = gateway.clone();
        DispatchPlanUseCase::new(gateway, registry()).with_params(params)
    }

    fn fast_params() -> DispatchParams {
        DispatchParams::default().with_retry_backoff(Duration::from_millis(10))
    }

    fn two_region_plan() -> CallPlan {
        CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "check_security_services").with_literal("region", "us-west-2"))
            .with_step(CallPlanStep::new(StepId(1), "get_cost_breakdown").with_literal("region", "us-west-2"))
    }

    fn cost_then_roi() -> CallPlan {
        CallPlan::new()
            .with_step(
                CallPlanStep::new(StepId(0), "get_cost_breakdown")
                    .with_literal("time_window", "2026-09-01/2026-09-30"),
            )
            .with_step(
                CallPlanStep::new(StepId(1), "calculate_security_roi")
                    .with_literal("time_window", "2026-09-01/2026-09-30")
                    .with_step_output("security_costs", StepId(0), "/total_cost"),
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_steps_run_concurrently_in_declaration_order() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("check_security_services", Reply::Slow(Duration::from_secs(2), json!({"security_score": 85})))
                .reply("get_cost_breakdown", Reply::Ok(json!({"total_cost": 125.5}))),
        );
        let started = Instant::now();
        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(two_region_plan()))
            .await
            .unwrap();

        assert_eq!(gateway.peak.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(3));
        let tools: Vec<&str> = outcome.results.iter().map(|r| r.tool_name()).collect();
        assert_eq!(tools, vec!["check_security_services", "get_cost_breakdown"]);
        assert!(outcome.results.iter().all(|r| r.is_success()));
        assert_eq!(outcome.sticky_updates["region"], json!("us-west-2"));
    }

    #[tokio::test]
    async fn test_cycle_fails_fast_without_calls() {
        let gateway = Arc::new(ScriptedGateway::default());
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "get_cost_breakdown").depends_on(StepId(1)))
            .with_step(CallPlanStep::new(StepId(1), "calculate_security_roi").depends_on(StepId(0)))
            .with_step(CallPlanStep::new(StepId(2), "check_security_services"));

        let error = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap_err();

        assert!(matches!(error, DispatchError::InvalidPlan(ref e) if e.is_configuration()));
        assert!(gateway.called_tools().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_fast_without_calls() {
        let gateway = Arc::new(ScriptedGateway::default());
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "check_security_services"))
            .with_step(CallPlanStep::new(StepId(1), "launch_rockets"));

        let error = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("launch_rockets"));
        assert!(gateway.called_tools().is_empty());
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent_but_not_siblings() {
        let gateway = Arc::new(
            ScriptedGateway::default().reply("get_cost_breakdown", Reply::Fail(GatewayFailureKind::Domain)),
        );
        let plan = cost_then_roi().with_step(CallPlanStep::new(StepId(2), "check_security_services"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert_eq!(outcome.results[0].failure_kind(), Some(FailureKind::Domain));
        assert_eq!(outcome.results[1].failure_kind(), Some(FailureKind::DependencyFailed));
        assert!(outcome.results[2].is_success());
        let calls = gateway.called_tools();
        assert!(!calls.contains(&"calculate_security_roi".to_string()));
        // Domain failures are not retried
        assert_eq!(calls.iter().filter(|t| *t == "get_cost_breakdown").count(), 1);
    }

    #[tokio::test]
    async fn test_dependent_step_receives_upstream_value() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("get_cost_breakdown", Reply::Ok(json!({"total_cost": 125.5, "currency": "USD"}))),
        );
        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(cost_then_roi()))
            .await
            .unwrap();

        assert!(outcome.results.iter().all(|r| r.is_success()));
        let roi_call = gateway.call_for("calculate_security_roi").unwrap();
        assert_eq!(roi_call.arguments["security_costs"], json!(125.5));
        assert_eq!(roi_call.backend_address, "gw/roi");
        assert_eq!(gateway.called_tools(), vec!["get_cost_breakdown", "calculate_security_roi"]);
    }

    #[tokio::test]
    async fn test_missing_required_parameter_is_never_dispatched() {
        let gateway = Arc::new(ScriptedGateway::default());
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "calculate_security_roi"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert_eq!(outcome.results[0].failure_kind(), Some(FailureKind::MissingParameter));
        assert_eq!(outcome.results[0].missing(), ["time_window".to_string()]);
        assert!(gateway.called_tools().is_empty());
    }

    #[tokio::test]
    async fn test_session_defaults_fill_missing_values() {
        let gateway = Arc::new(ScriptedGateway::default());
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "calculate_security_roi"));
        let mut defaults = IndexMap::new();
        defaults.insert("time_window".to_string(), json!("2026-09-01/2026-09-30"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan).with_session_defaults(defaults))
            .await
            .unwrap();

        assert!(outcome.results[0].is_success());
        assert_eq!(outcome.results[0].arguments()["time_window"], json!("2026-09-01/2026-09-30"));
        // Inherited values are not re-written
        assert!(outcome.sticky_updates.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_explicit_value_is_not_dispatched() {
        let gateway = Arc::new(ScriptedGateway::default());
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "check_security_services").with_literal("region", "mars-1"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert_eq!(outcome.results[0].failure_kind(), Some(FailureKind::InvalidParameter));
        assert!(gateway.called_tools().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_once() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("forecast_costs", Reply::Fail(GatewayFailureKind::Transient))
                .reply("forecast_costs", Reply::Ok(json!({"forecast_total": 400.0}))),
        );
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "forecast_costs"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert!(outcome.results[0].is_success());
        assert_eq!(outcome.results[0].attempt(), 2);
        assert_eq!(outcome.results[0].arguments()["forecast_months"], json!(3));
        assert_eq!(gateway.called_tools().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_transient_failure_is_final() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("forecast_costs", Reply::Fail(GatewayFailureKind::Transient))
                .reply("forecast_costs", Reply::Fail(GatewayFailureKind::Transient))
                .reply("forecast_costs", Reply::Ok(json!({}))),
        );
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "forecast_costs"));

        let outcome = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert_eq!(outcome.results[0].failure_kind(), Some(FailureKind::Transient));
        assert_eq!(gateway.called_tools().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout_then_retry_timeout() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("get_cost_breakdown", Reply::Slow(Duration::from_secs(60), json!({})))
                .reply("get_cost_breakdown", Reply::Slow(Duration::from_secs(60), json!({}))),
        );
        let params = fast_params()
            .with_step_timeout(Duration::from_secs(1))
            .with_plan_timeout(Duration::from_secs(30));

        let outcome = dispatcher(&gateway, params)
            .execute(DispatchPlanInput::new(two_region_plan()))
            .await
            .unwrap();

        assert!(outcome.results[0].is_success());
        let cost = &outcome.results[1];
        assert_eq!(cost.failure_kind(), Some(FailureKind::Timeout));
        assert_eq!(cost.attempt(), 2);
        assert!(cost.error_detail().unwrap().contains("1000 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_deadline_returns_partial_results() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("get_cost_breakdown", Reply::Slow(Duration::from_secs(20), json!({}))),
        );
        let params = fast_params()
            .with_step_timeout(Duration::from_secs(30))
            .with_plan_timeout(Duration::from_secs(5));

        let started = Instant::now();
        let outcome = dispatcher(&gateway, params)
            .execute(DispatchPlanInput::new(two_region_plan()))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(outcome.results[0].is_success());
        assert_eq!(outcome.results[1].failure_kind(), Some(FailureKind::Timeout));
        assert!(outcome.results[1].error_detail().unwrap().contains("plan deadline"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_dispatch() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .reply("check_security_services", Reply::Slow(Duration::from_secs(10), json!({}))),
        );
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result = dispatcher(&gateway, fast_params())
            .execute(DispatchPlanInput::new(two_region_plan()).with_cancellation(token))
            .await;

        assert_eq!(result, Err(DispatchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_bound_queues_fifo() {
        let mut gateway = ScriptedGateway::default();
        for tool in ["check_security_services", "get_security_findings", "get_cost_breakdown", "forecast_costs"] {
            gateway = gateway.reply(tool, Reply::Slow(Duration::from_millis(100), json!({"tool": tool})));
        }
        let gateway = Arc::new(gateway);
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "check_security_services"))
            .with_step(CallPlanStep::new(StepId(1), "get_security_findings"))
            .with_step(CallPlanStep::new(StepId(2), "get_cost_breakdown"))
            .with_step(CallPlanStep::new(StepId(3), "forecast_costs"));

        let outcome = dispatcher(&gateway, fast_params().with_max_in_flight(2))
            .execute(DispatchPlanInput::new(plan))
            .await
            .unwrap();

        assert_eq!(gateway.peak.load(Ordering::SeqCst), 2);
        assert_eq!(
            gateway.called_tools(),
            vec!["check_security_services", "get_security_findings", "get_cost_breakdown", "forecast_costs"]
        );
        assert!(outcome.results.iter().all(|r| r.is_success()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn four_independent_steps() -> CallPlan {
            CallPlan::new()
                .with_step(CallPlanStep::new(StepId(0), "check_security_services"))
                .with_step(CallPlanStep::new(StepId(1), "get_security_findings"))
                .with_step(CallPlanStep::new(StepId(2), "get_cost_breakdown"))
                .with_step(CallPlanStep::new(StepId(3), "forecast_costs"))
        }

        fn narrative_with_delays(delays: &[u64], fail_index: usize) -> (String, usize) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let plan = four_independent_steps();
            let mut gateway = ScriptedGateway::default();
            for (index, (step, delay)) in plan.steps.iter().zip(delays).enumerate() {
                let reply = if index == fail_index {
                    Reply::Fail(GatewayFailureKind::Domain)
                } else {
                    Reply::Slow(Duration::from_millis(*delay), json!({"tool": step.tool_name}))
                };
                gateway = gateway.reply(&step.tool_name, reply);
            }
            let gateway = Arc::new(gateway);

            let outcome = runtime
                .block_on(dispatcher(&gateway, fast_params()).execute(DispatchPlanInput::new(plan.clone())))
                .unwrap();
            let answer = synthesize(&plan, &outcome.results, NarrativeStyle::Executive);
            (answer.narrative, gateway.peak.load(Ordering::SeqCst))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn narrative_independent_of_completion_order(
                delays in proptest::collection::vec(0u64..500, 4),
                fail_index in 0usize..5,
            ) {
                let (baseline, _) = narrative_with_delays(&[0, 0, 0, 0], fail_index);
                let (narrative, peak) = narrative_with_delays(&delays, fail_index);
                prop_assert_eq!(baseline, narrative);
                prop_assert!(peak >= 1);
            }
        }
    }
}
