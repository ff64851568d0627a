//! Aggregator / Synthesizer
//!
//! Pure function of (plan, results, style): no I/O, no clock, no
//! randomness. Narrative content follows plan declaration order, never
//! completion order, so the same inputs always render the same bytes.

use super::entities::{AggregatedAnswer, Clarification, NarrativeStyle, UnavailableTool};
use crate::core::string::truncate;
use crate::plan::{CallPlan, StepId};
use crate::tool::{FailureKind, ToolInvocationResult};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

const FALLBACK_DETAIL_LEN: usize = 160;

/// Merge step results into one answer.
pub fn synthesize(
    plan: &CallPlan,
    results: &[ToolInvocationResult],
    style: NarrativeStyle,
) -> AggregatedAnswer {
    if plan.is_unrecognized() || plan.is_empty() {
        return AggregatedAnswer::unrecognized();
    }

    let by_step: HashMap<StepId, &ToolInvocationResult> =
        results.iter().map(|r| (r.step_id(), r)).collect();

    let mut successes: Vec<&ToolInvocationResult> = Vec::new();
    let mut unavailable: Vec<UnavailableTool> = Vec::new();
    let mut clarification: Option<Clarification> = None;

    for step in &plan.steps {
        match by_step.get(&step.id) {
            Some(result) if result.is_success() => successes.push(*result),
            Some(result) => {
                let kind = result.failure_kind().unwrap_or(FailureKind::Domain);
                if kind == FailureKind::MissingParameter
                    && clarification.is_none()
                    && let Some(param) = result.missing().first()
                {
                    clarification = Some(Clarification {
                        tool_name: result.tool_name().to_string(),
                        parameter: param.clone(),
                        question: clarification_question(result.tool_name(), param),
                    });
                }
                unavailable.push(UnavailableTool {
                    step_id: step.id,
                    tool_name: result.tool_name().to_string(),
                    kind,
                    detail: result.error_detail().unwrap_or_default().to_string(),
                });
            }
            None => unavailable.push(UnavailableTool {
                step_id: step.id,
                tool_name: step.tool_name.clone(),
                kind: FailureKind::Timeout,
                detail: "no result was recorded".to_string(),
            }),
        }
    }

    let mut per_tool_results: IndexMap<String, ToolInvocationResult> = IndexMap::new();
    for result in &successes {
        let key = if per_tool_results.contains_key(result.tool_name()) {
            format!("{}{}", result.tool_name(), result.step_id())
        } else {
            result.tool_name().to_string()
        };
        per_tool_results.insert(key, (*result).clone());
    }

    let only_clarifications = unavailable
        .iter()
        .all(|u| u.kind == FailureKind::MissingParameter);

    let narrative = if successes.is_empty() && only_clarifications {
        clarification
            .as_ref()
            .map(|c| c.question.clone())
            .unwrap_or_default()
    } else if successes.is_empty() {
        render_all_failed(&unavailable, clarification.as_ref())
    } else {
        let mut sections = match style {
            NarrativeStyle::Executive => render_executive(&successes),
            NarrativeStyle::Passthrough => render_passthrough(&successes),
        };
        if !unavailable.is_empty() {
            sections.push(render_notice(&unavailable));
        }
        if let Some(c) = &clarification {
            sections.push(c.question.clone());
        }
        sections.join("\n\n")
    };

    AggregatedAnswer {
        per_tool_results,
        degraded: !unavailable.is_empty() && !(successes.is_empty() && only_clarifications),
        unavailable,
        narrative,
        clarification,
    }
}

/// Human label for a tool, e.g. `get_cost_breakdown` → "Cost breakdown".
pub fn tool_label(tool_name: &str) -> String {
    let label = match tool_name {
        "check_security_services" => "Security services",
        "get_security_findings" => "Security findings",
        "check_compliance" => "Compliance",
        "get_security_service_costs" => "Security service costs",
        "analyze_cost_trends" => "Cost trends",
        "get_cost_breakdown" => "Cost breakdown",
        "forecast_costs" => "Cost forecast",
        "calculate_security_roi" => "Security ROI",
        "analyze_cost_benefit" => "Cost-benefit analysis",
        "generate_roi_report" => "ROI report",
        "optimize_security_spend" => "Spend optimization",
        other => {
            let words = other.replace('_', " ");
            let mut chars = words.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
    };
    label.to_string()
}

/// Follow-up question naming the missing parameter.
pub fn clarification_question(tool_name: &str, parameter: &str) -> String {
    let (what, example) = match parameter {
        "time_window" => ("time period", "\"last month\", \"last 90 days\" or \"2026-01-01 to 2026-03-31\""),
        "region" => ("AWS region", "\"us-east-1\" or \"Oregon\""),
        "services" | "service" => ("security service", "\"GuardDuty\" or \"Security Hub\""),
        "severity" => ("finding severity", "\"critical\" or \"high\""),
        "forecast_months" => ("forecast horizon", "\"next 6 months\""),
        _ => ("", ""),
    };
    if what.is_empty() {
        format!(
            "To run the {} I need a value for '{}'. What should I use?",
            tool_label(tool_name).to_lowercase(),
            parameter
        )
    } else {
        format!(
            "Which {} should I use for the {} ('{}')? For example {}.",
            what,
            tool_label(tool_name).to_lowercase(),
            parameter,
            example
        )
    }
}

fn render_executive(successes: &[&ToolInvocationResult]) -> Vec<String> {
    let summaries: Vec<(String, PayloadSummary)> = successes
        .iter()
        .map(|r| {
            (
                tool_label(r.tool_name()),
                summarize_payload(r.payload().unwrap_or(&Value::Null)),
            )
        })
        .collect();

    let headlines: Vec<String> = summaries
        .iter()
        .map(|(label, s)| {
            s.headline
                .clone()
                .unwrap_or_else(|| format!("{} retrieved", label))
        })
        .collect();
    let mut summary = format!("Summary: {}.", headlines.join("; "));
    if let Some(first) = summary.get(9..10) {
        let upper = first.to_uppercase();
        summary.replace_range(9..10, &upper);
    }

    let details: Vec<String> = summaries
        .iter()
        .map(|(label, s)| format!("- {}: {}", label, s.detail))
        .collect();

    vec![summary, details.join("\n")]
}

fn render_passthrough(successes: &[&ToolInvocationResult]) -> Vec<String> {
    successes
        .iter()
        .map(|r| {
            let body = r
                .payload()
                .and_then(|p| serde_json::to_string_pretty(p).ok())
                .unwrap_or_default();
            format!("{}:\n{}", r.tool_name(), body)
        })
        .collect()
}

fn describe_failure(u: &UnavailableTool) -> String {
    let mut line = format!(
        "- {} ({}): {}",
        tool_label(&u.tool_name),
        u.tool_name,
        u.kind.describe()
    );
    if !u.detail.is_empty() {
        line.push_str(&format!(" ({})", truncate(&u.detail, 120)));
    }
    line
}

fn render_notice(unavailable: &[UnavailableTool]) -> String {
    let lines: Vec<String> = unavailable.iter().map(describe_failure).collect();
    format!(
        "Note: this answer is partial. The following data is unavailable:\n{}",
        lines.join("\n")
    )
}

fn render_all_failed(unavailable: &[UnavailableTool], clarification: Option<&Clarification>) -> String {
    let lines: Vec<String> = unavailable.iter().map(describe_failure).collect();
    let mut text = format!(
        "Sorry, I couldn't retrieve any of the requested data, so I have no figures to report:\n{}",
        lines.join("\n")
    );
    if let Some(c) = clarification {
        text.push_str("\n\n");
        text.push_str(&c.question);
    }
    text
}

#[derive(Debug, Clone, PartialEq)]
struct PayloadSummary {
    headline: Option<String>,
    detail: String,
}

fn money(amount: f64, payload: &Value) -> String {
    match payload.get("currency").and_then(Value::as_str) {
        None | Some("USD") => format!("${:.2}", amount),
        Some(currency) => format!("{:.2} {}", amount, currency),
    }
}

fn number(payload: &Value, key: &str) -> Option<f64> {
    payload.get(key).and_then(Value::as_f64)
}

/// Headline figures by recognised payload fields; unknown shapes fall back to
/// compact JSON.
fn summarize_payload(payload: &Value) -> PayloadSummary {
    if let Some(roi) = number(payload, "roi_percentage") {
        let mut detail = format!("ROI of {:.1}%", roi);
        if let (Some(savings), Some(investment)) =
            (number(payload, "savings"), number(payload, "investment"))
        {
            detail.push_str(&format!(
                " ({} in savings on {} invested)",
                money(savings, payload),
                money(investment, payload)
            ));
        }
        return PayloadSummary {
            headline: Some(format!("security ROI is {:.1}%", roi)),
            detail,
        };
    }

    if let Some(score) = number(payload, "security_score") {
        let mut detail = format!("security score {}/100", score);
        if let Some(services) = payload.get("services").and_then(Value::as_object) {
            let enabled: Vec<&str> = services
                .iter()
                .filter(|(_, s)| s.get("enabled").and_then(Value::as_bool).unwrap_or(false))
                .map(|(name, _)| name.as_str())
                .collect();
            let disabled: Vec<&str> = services
                .keys()
                .map(String::as_str)
                .filter(|name| !enabled.contains(name))
                .collect();
            detail.push_str(&format!(
                "; {} of {} services enabled ({})",
                enabled.len(),
                services.len(),
                enabled.join(", ")
            ));
            if !disabled.is_empty() {
                detail.push_str(&format!("; not enabled: {}", disabled.join(", ")));
            }
        }
        return PayloadSummary {
            headline: Some(format!("security score is {}/100", score)),
            detail,
        };
    }

    if let Some(score) = number(payload, "compliance_score") {
        let scope = payload
            .get("compliance_type")
            .and_then(Value::as_str)
            .unwrap_or("overall")
            .replace('_', " ");
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();
        return PayloadSummary {
            headline: Some(format!("{} compliance is {:.0}%", scope, score)),
            detail: format!("{} compliance score {:.0}%{}", scope, score, status),
        };
    }

    if let Some(total) = payload
        .get("total_count")
        .and_then(Value::as_u64)
        .or_else(|| {
            payload
                .get("findings")
                .and_then(Value::as_array)
                .map(|f| f.len() as u64)
        })
    {
        let mut detail = format!("{} findings", total);
        if let Some(counts) = payload.get("severity_counts").and_then(Value::as_object) {
            let parts: Vec<String> = counts
                .iter()
                .map(|(severity, n)| format!("{} {}", n, severity))
                .collect();
            if !parts.is_empty() {
                detail.push_str(&format!(" ({})", parts.join(", ")));
            }
        }
        return PayloadSummary {
            headline: Some(format!("{} open security findings", total)),
            detail,
        };
    }

    if let Some(total) = number(payload, "total_cost") {
        let mut detail = format!("{} total", money(total, payload));
        if let Some(services) = payload.get("services").and_then(Value::as_object) {
            let parts: Vec<String> = services
                .iter()
                .filter_map(|(name, s)| {
                    s.get("cost")
                        .and_then(Value::as_f64)
                        .or_else(|| s.as_f64())
                        .map(|cost| format!("{} {}", name, money(cost, payload)))
                })
                .collect();
            if !parts.is_empty() {
                detail.push_str(&format!(" ({})", parts.join(", ")));
            }
        }
        return PayloadSummary {
            headline: Some(format!("security services cost {}", money(total, payload))),
            detail,
        };
    }

    if let Some(change) = number(payload, "change_percent") {
        let trend = payload
            .get("trend")
            .and_then(Value::as_str)
            .unwrap_or(if change >= 0.0 { "increasing" } else { "decreasing" });
        let period = number(payload, "period_days")
            .map(|d| format!(" over {} days", d))
            .unwrap_or_default();
        return PayloadSummary {
            headline: Some(format!("costs are {} ({:+.1}%{})", trend, change, period)),
            detail: format!("{} by {:+.1}%{}", trend, change, period),
        };
    }

    if let Some(forecast) = number(payload, "forecast_total") {
        let months = number(payload, "forecast_months")
            .map(|m| format!(" over the next {} months", m))
            .unwrap_or_default();
        return PayloadSummary {
            headline: Some(format!("forecast spend is {}{}", money(forecast, payload), months)),
            detail: format!("{} forecast{}", money(forecast, payload), months),
        };
    }

    if let Some(ratio) = number(payload, "benefit_cost_ratio") {
        return PayloadSummary {
            headline: Some(format!("benefit/cost ratio is {:.2}", ratio)),
            detail: format!("benefit/cost ratio {:.2}", ratio),
        };
    }

    if let Some(savings) = payload.get("potential_savings") {
        let annual = savings
            .get("annual")
            .and_then(Value::as_f64)
            .or_else(|| savings.as_f64());
        let count = payload
            .get("recommendations")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if let Some(annual) = annual {
            return PayloadSummary {
                headline: Some(format!("potential savings of {} per year", money(annual, payload))),
                detail: format!(
                    "{} recommendations, potential savings {} per year",
                    count,
                    money(annual, payload)
                ),
            };
        }
    }

    if let Some(text) = payload.get("executive_summary").and_then(Value::as_str) {
        return PayloadSummary {
            headline: None,
            detail: truncate(text, 240),
        };
    }

    let compact = match payload {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    PayloadSummary {
        headline: None,
        detail: truncate(&compact, FALLBACK_DETAIL_LEN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::CallPlanStep;
    use serde_json::json;

    fn two_step_plan() -> CallPlan {
        CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "check_security_services"))
            .with_step(CallPlanStep::new(StepId(1), "get_cost_breakdown"))
    }

    fn security_ok() -> ToolInvocationResult {
        ToolInvocationResult::success(
            StepId(0),
            "check_security_services",
            json!({
                "security_score": 85,
                "services": {
                    "guardduty": {"enabled": true, "status": "ACTIVE"},
                    "inspector": {"enabled": false, "status": "DISABLED"}
                }
            }),
            12,
        )
    }

    fn cost_ok() -> ToolInvocationResult {
        ToolInvocationResult::success(
            StepId(1),
            "get_cost_breakdown",
            json!({
                "total_cost": 125.5,
                "currency": "USD",
                "services": {"guardduty": {"cost": 45.2}, "securityhub": {"cost": 80.3}}
            }),
            30,
        )
    }

    #[test]
    fn test_all_success() {
        let answer = synthesize(&two_step_plan(), &[security_ok(), cost_ok()], NarrativeStyle::Executive);

        assert!(!answer.degraded);
        assert_eq!(answer.per_tool_results.len(), 2);
        assert!(answer.unavailable.is_empty());
        assert!(answer.narrative.starts_with(
            "Summary: Security score is 85/100; security services cost $125.50."
        ));
        assert!(answer.narrative.contains("1 of 2 services enabled (guardduty)"));
        assert!(answer.narrative.contains("guardduty $45.20, securityhub $80.30"));
    }

    #[test]
    fn test_order_follows_plan_not_completion() {
        let forward = synthesize(&two_step_plan(), &[security_ok(), cost_ok()], NarrativeStyle::Executive);
        let reversed = synthesize(&two_step_plan(), &[cost_ok(), security_ok()], NarrativeStyle::Executive);
        assert_eq!(forward.narrative, reversed.narrative);
        assert_eq!(
            reversed.per_tool_results.keys().collect::<Vec<_>>(),
            vec!["check_security_services", "get_cost_breakdown"]
        );
    }

    #[test]
    fn test_partial_failure_is_degraded_and_named() {
        let timeout = ToolInvocationResult::failure(
            StepId(1),
            "get_cost_breakdown",
            FailureKind::Timeout,
            "no response within 30000 ms",
            30_000,
        );
        let answer = synthesize(&two_step_plan(), &[security_ok(), timeout], NarrativeStyle::Executive);

        assert!(answer.degraded);
        assert_eq!(answer.per_tool_results.len(), 1);
        assert!(answer.narrative.contains("Security score is 85/100"));
        assert!(answer.narrative.contains("Cost breakdown (get_cost_breakdown): the request timed out"));
        assert_eq!(answer.unavailable[0].kind, FailureKind::Timeout);
    }

    #[test]
    fn test_all_failed_is_apology_without_figures() {
        let a = ToolInvocationResult::failure(StepId(0), "check_security_services", FailureKind::Transient, "503", 5);
        let b = ToolInvocationResult::failure(StepId(1), "get_cost_breakdown", FailureKind::Domain, "400", 5);
        let answer = synthesize(&two_step_plan(), &[a, b], NarrativeStyle::Executive);

        assert!(answer.degraded);
        assert!(answer.per_tool_results.is_empty());
        assert!(answer.narrative.starts_with("Sorry"));
        assert!(answer.narrative.contains("temporarily unreachable"));
        assert!(answer.narrative.contains("rejected the request"));
        assert!(!answer.narrative.contains('$'));
    }

    #[test]
    fn test_missing_parameter_becomes_clarification() {
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "calculate_security_roi"));
        let missing = ToolInvocationResult::missing_parameters(
            StepId(0),
            "calculate_security_roi",
            vec!["time_window".to_string()],
        );
        let answer = synthesize(&plan, &[missing], NarrativeStyle::Executive);

        let clarification = answer.clarification.as_ref().unwrap();
        assert_eq!(clarification.parameter, "time_window");
        assert_eq!(clarification.tool_name, "calculate_security_roi");
        assert!(!answer.degraded);
        assert_eq!(answer.narrative, clarification.question);
        assert!(answer.narrative.contains("time_window"));
        assert!(answer.narrative.contains("time period"));
    }

    #[test]
    fn test_passthrough_emits_exact_payloads() {
        let answer = synthesize(&two_step_plan(), &[security_ok(), cost_ok()], NarrativeStyle::Passthrough);
        assert!(answer.narrative.starts_with("check_security_services:\n{"));
        assert!(answer.narrative.contains("\"total_cost\": 125.5"));
        assert!(!answer.narrative.contains("Summary"));
    }

    #[test]
    fn test_repeated_tool_keys() {
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(0), "get_cost_breakdown"))
            .with_step(CallPlanStep::new(StepId(1), "get_cost_breakdown"));
        let first = ToolInvocationResult::success(StepId(0), "get_cost_breakdown", json!({"total_cost": 1.0}), 1);
        let second = ToolInvocationResult::success(StepId(1), "get_cost_breakdown", json!({"total_cost": 2.0}), 1);
        let answer = synthesize(&plan, &[second, first], NarrativeStyle::Executive);
        assert_eq!(
            answer.per_tool_results.keys().collect::<Vec<_>>(),
            vec!["get_cost_breakdown", "get_cost_breakdown#1"]
        );
    }

    #[test]
    fn test_unknown_payload_falls_back_to_json() {
        let plan = CallPlan::new().with_step(CallPlanStep::new(StepId(0), "generate_roi_report"));
        let result = ToolInvocationResult::success(StepId(0), "generate_roi_report", json!({"pages": 3}), 1);
        let answer = synthesize(&plan, &[result], NarrativeStyle::Executive);
        assert!(answer.narrative.contains("Summary: ROI report retrieved."));
        assert!(answer.narrative.contains("- ROI report: {\"pages\":3}"));
    }

    #[test]
    fn test_unrecognized_plan() {
        let answer = synthesize(&CallPlan::unrecognized(), &[], NarrativeStyle::Executive);
        assert_eq!(answer, AggregatedAnswer::unrecognized());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn four_step_plan() -> CallPlan {
            CallPlan::new()
                .with_step(CallPlanStep::new(StepId(0), "check_security_services"))
                .with_step(CallPlanStep::new(StepId(1), "get_cost_breakdown"))
                .with_step(CallPlanStep::new(StepId(2), "calculate_security_roi"))
                .with_step(CallPlanStep::new(StepId(3), "get_security_findings"))
        }

        fn results() -> Vec<ToolInvocationResult> {
            vec![
                security_ok(),
                cost_ok(),
                ToolInvocationResult::success(
                    StepId(2),
                    "calculate_security_roi",
                    json!({"roi_percentage": 15.8, "investment": 125.5, "savings": 198.75}),
                    7,
                ),
                ToolInvocationResult::failure(
                    StepId(3),
                    "get_security_findings",
                    FailureKind::Transient,
                    "HTTP 503",
                    40,
                ),
            ]
        }

        proptest! {
            #[test]
            fn synthesis_ignores_completion_order(
                shuffled in Just(results()).prop_shuffle(),
                passthrough in any::<bool>(),
            ) {
                let style = if passthrough { NarrativeStyle::Passthrough } else { NarrativeStyle::Executive };
                let plan = four_step_plan();
                let expected = synthesize(&plan, &results(), style);
                let actual = synthesize(&plan, &shuffled, style);
                prop_assert_eq!(&expected.narrative, &actual.narrative);
                prop_assert_eq!(expected, actual);
            }
        }
    }
}
