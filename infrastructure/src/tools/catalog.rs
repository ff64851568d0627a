//! Default tool catalog
//!
//! The eleven tools served by the security, cost and ROI tool-servers.
//! Each tool-server lives at `<base url>/<domain>`, unless the
//! configuration overrides the address for a domain.

use insights_domain::{
    DomainError, ParamSpec, ParamType, ParamValidator, ToolDescriptor, ToolDomain, ToolRegistry,
};
use std::collections::HashMap;

/// Alternative names accepted for catalog tools.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("security_status", "check_security_services"),
    ("security_services", "check_security_services"),
    ("findings", "get_security_findings"),
    ("compliance", "check_compliance"),
    ("security_costs", "get_security_service_costs"),
    ("cost_trends", "analyze_cost_trends"),
    ("cost_breakdown", "get_cost_breakdown"),
    ("cost_forecast", "forecast_costs"),
    ("security_roi", "calculate_security_roi"),
    ("cost_benefit", "analyze_cost_benefit"),
    ("roi_report", "generate_roi_report"),
    ("optimize_spend", "optimize_security_spend"),
];

const SERVICES: &[&str] = &[
    "guardduty",
    "securityhub",
    "inspector",
    "config",
    "macie",
    "accessanalyzer",
    "cloudtrail",
    "waf",
];

fn region() -> ParamSpec {
    ParamSpec::new("region", "AWS region to query, e.g. us-east-1", ParamType::String)
        .with_validator(ParamValidator::Region)
        .sticky()
}

fn time_window() -> ParamSpec {
    ParamSpec::new(
        "time_window",
        "Reporting period as YYYY-MM-DD/YYYY-MM-DD",
        ParamType::TimeWindow,
    )
    .sticky()
}

fn services() -> ParamSpec {
    ParamSpec::new("services", "Security services to include", ParamType::StringList)
        .one_of(SERVICES)
        .sticky()
}

fn service_filter() -> ParamSpec {
    ParamSpec::new("service", "Service to analyze, or \"all\"", ParamType::String).with_default("all")
}

fn security_tools(base: &str) -> Vec<ToolDescriptor> {
    let tool = |name: &str, description: &str| {
        ToolDescriptor::new(name, description, ToolDomain::Security, base)
    };
    vec![
        tool(
            "check_security_services",
            "Check which AWS security services are enabled and score the posture",
        )
        .with_parameter(region())
        .with_parameter(services()),
        tool(
            "get_security_findings",
            "Get security findings from GuardDuty, Security Hub or Inspector",
        )
        .with_parameter(
            ParamSpec::new("service", "Finding source", ParamType::String)
                .one_of(&["guardduty", "securityhub", "inspector"])
                .with_default("guardduty")
                .sticky(),
        )
        .with_parameter(
            ParamSpec::new("severity", "Minimum finding severity", ParamType::String)
                .one_of(&["CRITICAL", "HIGH", "MEDIUM", "LOW"])
                .sticky(),
        )
        .with_parameter(region())
        .with_parameter(
            ParamSpec::new("limit", "Maximum number of findings", ParamType::Integer)
                .with_default(50)
                .with_validator(ParamValidator::Range { min: 1.0, max: 1000.0 }),
        ),
        tool("check_compliance", "Check compliance against a security baseline")
            .with_parameter(
                ParamSpec::new("compliance_type", "Baseline to check", ParamType::String)
                    .one_of(&["encryption", "network_security", "access_control"])
                    .with_default("encryption"),
            )
            .with_parameter(region()),
    ]
}

fn cost_tools(base: &str) -> Vec<ToolDescriptor> {
    let tool =
        |name: &str, description: &str| ToolDescriptor::new(name, description, ToolDomain::Cost, base);
    vec![
        tool(
            "get_security_service_costs",
            "Get costs of AWS security services for a period",
        )
        .with_parameter(services())
        .with_parameter(time_window())
        .with_parameter(
            ParamSpec::new("granularity", "Cost aggregation granularity", ParamType::String)
                .one_of(&["DAILY", "MONTHLY"])
                .with_default("MONTHLY"),
        )
        .with_parameter(region()),
        tool("analyze_cost_trends", "Analyze security cost trends and flag anomalies")
            .with_parameter(service_filter())
            .with_parameter(
                ParamSpec::new("period_days", "Days of history to analyze", ParamType::Integer)
                    .with_default(90)
                    .with_validator(ParamValidator::Range { min: 1.0, max: 365.0 }),
            )
            .with_parameter(
                ParamSpec::new(
                    "threshold_percent",
                    "Change that counts as an anomaly",
                    ParamType::Number,
                )
                .with_default(20.0),
            ),
        tool("get_cost_breakdown", "Break security spend down by service")
            .with_parameter(service_filter())
            .with_parameter(services())
            .with_parameter(time_window())
            .with_parameter(region()),
        tool("forecast_costs", "Forecast security service costs")
            .with_parameter(service_filter())
            .with_parameter(
                ParamSpec::new("forecast_months", "Months to forecast", ParamType::Integer)
                    .with_default(3)
                    .with_validator(ParamValidator::Range { min: 1.0, max: 12.0 }),
            ),
    ]
}

fn roi_tools(base: &str) -> Vec<ToolDescriptor> {
    let tool =
        |name: &str, description: &str| ToolDescriptor::new(name, description, ToolDomain::Roi, base);
    let required_window = || time_window().required();
    let risk_metrics = || {
        ParamSpec::new("risk_metrics", "Risk figures from security findings", ParamType::Object)
    };
    vec![
        tool(
            "calculate_security_roi",
            "Calculate return on investment for security services",
        )
        .with_parameter(required_window())
        .with_parameter(ParamSpec::new(
            "security_costs",
            "Security spend for the period",
            ParamType::Number,
        ))
        .with_parameter(services()),
        tool("analyze_cost_benefit", "Compare security spend with the risk it removes")
            .with_parameter(services())
            .with_parameter(required_window())
            .with_parameter(risk_metrics()),
        tool("generate_roi_report", "Generate an ROI report for security investments")
            .with_parameter(
                ParamSpec::new("report_type", "Report format", ParamType::String)
                    .one_of(&["executive_summary", "detailed_analysis", "quarterly_review"])
                    .with_default("executive_summary"),
            )
            .with_parameter(
                ParamSpec::new("include_forecasts", "Append cost forecasts", ParamType::Boolean)
                    .with_default(true),
            )
            .with_parameter(required_window()),
        tool(
            "optimize_security_spend",
            "Recommend changes to security spend for a risk tolerance",
        )
        .with_parameter(ParamSpec::new(
            "current_spend",
            "Current spend per service",
            ParamType::Object,
        ))
        .with_parameter(
            ParamSpec::new("risk_tolerance", "Acceptable level of risk", ParamType::String)
                .one_of(&["low", "medium", "high"])
                .with_default("medium"),
        )
        .with_parameter(ParamSpec::new(
            "optimization_goals",
            "Goals such as cost_reduction or coverage",
            ParamType::StringList,
        ))
        .with_parameter(risk_metrics()),
    ]
}

/// Backend address for a domain.
pub fn backend_address(base_url: &str, domain: ToolDomain, overrides: &HashMap<String, String>) -> String {
    match overrides.get(domain.as_str()) {
        Some(address) => address.clone(),
        None => format!("{}/{}", base_url.trim_end_matches('/'), domain.as_str()),
    }
}

/// All catalog descriptors, in registration order.
///
/// The first tool of each domain is the domain's primary tool.
pub fn default_descriptors(base_url: &str, overrides: &HashMap<String, String>) -> Vec<ToolDescriptor> {
    let address = |domain| backend_address(base_url, domain, overrides);
    let mut tools = security_tools(&address(ToolDomain::Security));
    tools.extend(cost_tools(&address(ToolDomain::Cost)));
    tools.extend(roi_tools(&address(ToolDomain::Roi)));
    tools
}

/// Build the registry with the default and configured aliases.
pub fn build_registry(
    base_url: &str,
    overrides: &HashMap<String, String>,
    aliases: &HashMap<String, String>,
) -> Result<ToolRegistry, DomainError> {
    let registry = ToolRegistry::from_descriptors(default_descriptors(base_url, overrides))?
        .register_aliases(DEFAULT_ALIASES.iter().copied())
        .register_aliases(aliases.iter().map(|(a, c)| (a.as_str(), c.as_str())));
    Ok(registry)
}
