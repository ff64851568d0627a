//! Shared fixtures for use case tests.

use crate::ports::tool_gateway::{GatewayFailure, GatewayFailureKind, InvocationRequest, ToolGateway};
use async_trait::async_trait;
use insights_domain::{ParamSpec, ParamType, ParamValidator, ToolDescriptor, ToolDomain, ToolRegistry};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub enum Reply {
    Ok(Value),
    Fail(GatewayFailureKind),
    Slow(Duration, Value),
}

/// Gateway replaying scripted replies per tool and recording calls.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<InvocationRequest>>,
    active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedGateway {
    pub fn reply(self, tool: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(tool.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.tool_name.clone()).collect()
    }

    pub fn call_for(&self, tool: &str) -> Option<InvocationRequest> {
        self.calls.lock().unwrap().iter().find(|c| c.tool_name == tool).cloned()
    }
}

#[async_trait]
impl ToolGateway for ScriptedGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Value, GatewayFailure> {
        self.calls.lock().unwrap().push(request.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&request.tool_name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Reply::Ok(json!({"tool": request.tool_name})));
        let outcome = match reply {
            Reply::Ok(payload) => Ok(payload),
            Reply::Fail(kind) => Err(GatewayFailure::new(kind, format!("scripted {}", kind))),
            Reply::Slow(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

pub fn registry() -> Arc<ToolRegistry> {
    let region = || {
        ParamSpec::new("region", "AWS region", ParamType::String)
            .with_validator(ParamValidator::Region)
            .sticky()
    };
    let window = || ParamSpec::new("time_window", "Window", ParamType::TimeWindow).sticky();
    Arc::new(
        ToolRegistry::from_descriptors([
            ToolDescriptor::new("check_security_services", "", ToolDomain::Security, "gw/security")
                .with_parameter(region()),
            ToolDescriptor::new("get_security_findings", "", ToolDomain::Security, "gw/security")
                .with_parameter(region()),
            ToolDescriptor::new("get_cost_breakdown", "", ToolDomain::Cost, "gw/cost")
                .with_parameter(window())
                .with_parameter(region()),
            ToolDescriptor::new("forecast_costs", "", ToolDomain::Cost, "gw/cost").with_parameter(
                ParamSpec::new("forecast_months", "", ParamType::Integer).with_default(3),
            ),
            ToolDescriptor::new("calculate_security_roi", "", ToolDomain::Roi, "gw/roi")
                .with_parameter(window().required())
                .with_parameter(ParamSpec::new("security_costs", "", ParamType::Number)),
        ])
        .unwrap(),
    )
}

