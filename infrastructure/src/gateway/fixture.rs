//! Offline gateway returning canned tool-server payloads.
//!
//! Used by `--offline` and by tests that need realistic payload shapes
//! without a network. Payloads are deterministic functions of the tool name
//! and its arguments.

use async_trait::async_trait;
use insights_application::ports::tool_gateway::{
    GatewayFailure, GatewayFailureKind, InvocationRequest, ToolGateway,
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FixtureToolGateway {
    latency: Duration,
    failures: HashMap<String, GatewayFailureKind>,
}

impl FixtureToolGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every call to `tool` fail with `kind`.
    pub fn with_failure(mut self, tool: impl Into<String>, kind: GatewayFailureKind) -> Self {
        self.failures.insert(tool.into(), kind);
        self
    }
}

#[async_trait]
impl ToolGateway for FixtureToolGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Value, GatewayFailure> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(kind) = self.failures.get(&request.tool_name) {
            return Err(GatewayFailure::new(
                *kind,
                format!("fixture failure for {}", request.tool_name),
            ));
        }
        debug!("Fixture response for {}", request.tool_name);
        fixture_payload(&request.tool_name, &request.arguments)
    }
}

fn text<'a>(arguments: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn services(arguments: &Map<String, Value>, default: &[&str]) -> Vec<String> {
    match arguments.get("services").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// Monthly list price used for every fixture cost figure.
fn service_cost(service: &str) -> f64 {
    match service {
        "guardduty" => 45.5,
        "securityhub" => 30.0,
        "inspector" => 25.0,
        "config" => 15.0,
        "macie" => 10.0,
        "cloudtrail" => 8.0,
        "waf" => 12.0,
        _ => 5.0,
    }
}

const DEFAULT_SERVICES: [&str; 4] = ["guardduty", "securityhub", "inspector", "config"];

fn fixture_payload(tool_name: &str, arguments: &Map<String, Value>) -> Result<Value, GatewayFailure> {
    let region = text(arguments, "region", "us-east-1");
    let window = arguments.get("time_window").cloned().unwrap_or(Value::Null);

    let payload = match tool_name {
        "check_security_services" => {
            let wanted = services(arguments, &DEFAULT_SERVICES);
            let mut statuses = Map::new();
            for service in &wanted {
                let enabled = service != "inspector";
                statuses.insert(service.clone(), json!({ "enabled": enabled }));
            }
            let enabled = statuses
                .values()
                .filter(|s| s["enabled"].as_bool().unwrap_or(false))
                .count();
            let score = if wanted.is_empty() { 0 } else { enabled * 100 / wanted.len() };
            json!({ "region": region, "services": statuses, "security_score": score })
        }
        "get_security_findings" => {
            let service = text(arguments, "service", "guardduty");
            let severity = text(arguments, "severity", "");
            let mut counts = Map::new();
            for (level, n) in [("CRITICAL", 1), ("HIGH", 3), ("MEDIUM", 7)] {
                if severity.is_empty() || severity == level {
                    counts.insert(level.to_string(), json!(n));
                }
            }
            let total: u64 = counts.values().filter_map(Value::as_u64).sum();
            json!({
                "service": service,
                "region": region,
                "total_count": total,
                "severity_counts": counts,
                "risk_metrics": {
                    "critical_findings": counts.get("CRITICAL").cloned().unwrap_or(json!(0)),
                    "high_findings": counts.get("HIGH").cloned().unwrap_or(json!(0)),
                },
            })
        }
        "check_compliance" => json!({
            "compliance_type": text(arguments, "compliance_type", "encryption"),
            "region": region,
            "compliance_score": 82,
            "status": "PARTIALLY_COMPLIANT",
        }),
        "get_security_service_costs" | "get_cost_breakdown" => {
            let mut by_service = Map::new();
            let mut total = 0.0;
            for service in services(arguments, &DEFAULT_SERVICES) {
                let cost = service_cost(&service);
                total += cost;
                by_service.insert(service, json!({ "cost": cost }));
            }
            json!({
                "time_window": window,
                "region": region,
                "total_cost": total,
                "currency": "USD",
                "services": by_service,
            })
        }
        "analyze_cost_trends" => {
            let period = arguments.get("period_days").and_then(Value::as_u64).unwrap_or(90);
            json!({
                "service": text(arguments, "service", "all"),
                "period_days": period,
                "change_percent": 12.5,
                "trend": "increasing",
            })
        }
        "forecast_costs" => {
            let months = arguments.get("forecast_months").and_then(Value::as_u64).unwrap_or(3);
            let monthly: f64 = DEFAULT_SERVICES.iter().map(|s| service_cost(s)).sum();
            json!({
                "service": text(arguments, "service", "all"),
                "forecast_months": months,
                "forecast_total": monthly * months as f64,
                "currency": "USD",
            })
        }
        "calculate_security_roi" => {
            let investment = arguments
                .get("security_costs")
                .and_then(Value::as_f64)
                .unwrap_or(115.5);
            let savings = (investment * 1.158 * 100.0).round() / 100.0;
            let roi = ((savings - investment) / investment * 1000.0).round() / 10.0;
            json!({
                "time_window": window,
                "investment": investment,
                "savings": savings,
                "roi_percentage": roi,
                "currency": "USD",
            })
        }
        "analyze_cost_benefit" => json!({
            "time_window": window,
            "services": services(arguments, &DEFAULT_SERVICES),
            "benefit_cost_ratio": 2.35,
        }),
        "generate_roi_report" => json!({
            "report_type": text(arguments, "report_type", "executive_summary"),
            "time_window": window,
            "executive_summary": "Security investments returned more than they cost over the period; \
                                  GuardDuty and Security Hub account for most of the avoided incident cost.",
        }),
        "optimize_security_spend" => json!({
            "risk_tolerance": text(arguments, "risk_tolerance", "medium"),
            "recommendations": [
                { "service": "inspector", "action": "reduce scan frequency on non-production accounts" },
                { "service": "macie", "action": "limit discovery jobs to sensitive buckets" },
            ],
            "potential_savings": { "monthly": 18.25, "annual": 219.0 },
            "currency": "USD",
        }),
        other => {
            return Err(GatewayFailure::domain(format!("Unknown tool: {}", other)));
        }
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tool: &str, arguments: Value) -> InvocationRequest {
        InvocationRequest {
            tool_name: tool.to_string(),
            backend_address: "fixture://".to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_cost_total_follows_services() {
        let gateway = FixtureToolGateway::new();
        let payload = gateway
            .invoke(&request(
                "get_cost_breakdown",
                json!({"services": ["guardduty", "securityhub"], "time_window": "2026-09-01/2026-09-30"}),
            ))
            .await
            .unwrap();
        assert_eq!(payload["total_cost"], json!(75.5));
        assert_eq!(payload["time_window"], json!("2026-09-01/2026-09-30"));
    }

    #[tokio::test]
    async fn test_roi_uses_security_costs() {
        let gateway = FixtureToolGateway::new();
        let payload = gateway
            .invoke(&request(
                "calculate_security_roi",
                json!({"time_window": "2026-09-01/2026-09-30", "security_costs": 100.0}),
            ))
            .await
            .unwrap();
        assert_eq!(payload["investment"], json!(100.0));
        assert_eq!(payload["roi_percentage"], json!(15.8));
    }

    #[tokio::test]
    async fn test_security_services_score() {
        let gateway = FixtureToolGateway::new();
        let payload = gateway
            .invoke(&request("check_security_services", json!({"region": "us-west-2"})))
            .await
            .unwrap();
        assert_eq!(payload["region"], json!("us-west-2"));
        assert_eq!(payload["security_score"], json!(75));
        assert_eq!(payload["services"]["inspector"]["enabled"], json!(false));
    }

    #[tokio::test]
    async fn test_findings_filtered_by_severity() {
        let gateway = FixtureToolGateway::new();
        let payload = gateway
            .invoke(&request("get_security_findings", json!({"severity": "HIGH"})))
            .await
            .unwrap();
        assert_eq!(payload["total_count"], json!(3));
        assert_eq!(payload["risk_metrics"]["critical_findings"], json!(0));
    }

    #[tokio::test]
    async fn test_configured_failure_and_unknown_tool() {
        let gateway =
            FixtureToolGateway::new().with_failure("forecast_costs", GatewayFailureKind::Transient);
        let failure = gateway.invoke(&request("forecast_costs", json!({}))).await.unwrap_err();
        assert_eq!(failure.kind, GatewayFailureKind::Transient);

        let failure = gateway.invoke(&request("delete_everything", json!({}))).await.unwrap_err();
        assert_eq!(failure.kind, GatewayFailureKind::Domain);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let gateway = FixtureToolGateway::new().with_latency(Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        gateway.invoke(&request("forecast_costs", json!({}))).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
