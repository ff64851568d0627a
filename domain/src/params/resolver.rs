//! Parameter Resolver
//!
//! Fills and validates the arguments of one plan step. Precedence for each
//! declared parameter:
//!
//! 1. explicit binding (literal, or a value taken from a dependency's payload)
//! 2. the session's last resolved value for that parameter name
//! 3. the descriptor default
//! 4. otherwise missing (an error only if the parameter is required)
//!
//! Explicit values that fail validation make the step `InvalidParameter`.
//! Inherited values that fail validation fall back to the descriptor default.

use crate::plan::{ArgValue, CallPlanStep, StepId};
use crate::tool::{DefaultSchemaValidator, ParamSpec, SchemaValidator, ToolDescriptor};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Arguments ready to send, plus sticky values to persist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedArguments {
    pub arguments: Map<String, Value>,
    /// Explicitly supplied values of sticky parameters
    pub sticky_updates: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready(ResolvedArguments),
    /// Required parameters with no value from any source
    Missing(Vec<String>),
    /// Validation messages for explicit values
    Invalid(Vec<String>),
}

/// Where a candidate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Literal,
    Upstream,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterResolver<V = DefaultSchemaValidator> {
    validator: V,
}

impl ParameterResolver<DefaultSchemaValidator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: SchemaValidator> ParameterResolver<V> {
    pub fn with_validator(validator: V) -> Self {
        Self { validator }
    }

    /// Resolve `step` against `descriptor`.
    ///
    /// `upstream` holds the payloads of successful dependency steps, used for
    /// `FromStep` bindings.
    pub fn resolve(
        &self,
        descriptor: &ToolDescriptor,
        step: &CallPlanStep,
        session_defaults: &IndexMap<String, Value>,
        upstream: &HashMap<StepId, Value>,
    ) -> Resolution {
        let mut resolved = ResolvedArguments::default();
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        for name in step.arguments.keys() {
            if descriptor.parameter(name).is_none() {
                invalid.push(format!(
                    "unknown parameter '{}' for tool '{}'",
                    name, descriptor.name
                ));
            }
        }

        for (name, spec) in &descriptor.parameters {
            let explicit = match step.arguments.get(name) {
                Some(ArgValue::Literal { value }) => Some((value.clone(), Source::Literal)),
                Some(ArgValue::FromStep { step: source, pointer }) => {
                    match upstream.get(source).and_then(|payload| payload.pointer(pointer)) {
                        Some(value) => Some((value.clone(), Source::Upstream)),
                        None => {
                            invalid.push(format!(
                                "step {} output has no value at '{}' for parameter '{}'",
                                source, pointer, name
                            ));
                            continue;
                        }
                    }
                }
                Some(ArgValue::Unresolved { .. }) | None => None,
            };

            if let Some((value, source)) = explicit {
                match self.validator.check(spec, &value) {
                    Ok(value) => {
                        if spec.sticky && source == Source::Literal {
                            resolved.sticky_updates.insert(name.clone(), value.clone());
                        }
                        resolved.arguments.insert(name.clone(), value);
                    }
                    Err(message) => invalid.push(message),
                }
                continue;
            }

            let value = session_defaults
                .get(name)
                .and_then(|value| self.validator.check(spec, value).ok())
                .or_else(|| self.default_for(spec));

            match value {
                Some(value) => {
                    resolved.arguments.insert(name.clone(), value);
                }
                None if spec.required => missing.push(name.clone()),
                None => {}
            }
        }

        if !invalid.is_empty() {
            Resolution::Invalid(invalid)
        } else if !missing.is_empty() {
            Resolution::Missing(missing)
        } else {
            Resolution::Ready(resolved)
        }
    }

    fn default_for(&self, spec: &ParamSpec) -> Option<Value> {
        spec.default
            .as_ref()
            .and_then(|default| self.validator.check(spec, default).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParamType, ParamValidator, ToolDomain};
    use serde_json::json;

    fn findings_tool() -> ToolDescriptor {
        ToolDescriptor::new("get_security_findings", "", ToolDomain::Security, "gw/security")
            .with_parameter(
                ParamSpec::new("service", "", ParamType::String)
                    .one_of(&["guardduty", "securityhub", "inspector"])
                    .with_default("guardduty")
                    .sticky(),
            )
            .with_parameter(
                ParamSpec::new("region", "", ParamType::String)
                    .with_validator(ParamValidator::Region)
                    .sticky(),
            )
            .with_parameter(
                ParamSpec::new("limit", "", ParamType::Integer)
                    .with_validator(ParamValidator::Range { min: 1.0, max: 1000.0 })
                    .with_default(50),
            )
    }

    fn roi_tool() -> ToolDescriptor {
        ToolDescriptor::new("calculate_security_roi", "", ToolDomain::Roi, "gw/roi")
            .with_parameter(
                ParamSpec::new("time_window", "", ParamType::TimeWindow)
                    .required()
                    .sticky(),
            )
            .with_parameter(ParamSpec::new("security_costs", "", ParamType::Number))
    }

    fn resolve(
        descriptor: &ToolDescriptor,
        step: &CallPlanStep,
        defaults: &IndexMap<String, Value>,
    ) -> Resolution {
        ParameterResolver::new().resolve(descriptor, step, defaults, &HashMap::new())
    }

    #[test]
    fn test_defaults_fill_optional_parameters() {
        let step = CallPlanStep::new(StepId(0), "get_security_findings");
        let Resolution::Ready(resolved) = resolve(&findings_tool(), &step, &IndexMap::new()) else {
            panic!("expected ready");
        };
        assert_eq!(resolved.arguments["service"], json!("guardduty"));
        assert_eq!(resolved.arguments["limit"], json!(50));
        assert!(!resolved.arguments.contains_key("region"));
        assert!(resolved.sticky_updates.is_empty());
    }

    #[test]
    fn test_explicit_beats_session_beats_default() {
        let mut defaults = IndexMap::new();
        defaults.insert("region".to_string(), json!("eu-west-1"));
        defaults.insert("service".to_string(), json!("inspector"));

        let step = CallPlanStep::new(StepId(0), "get_security_findings").with_literal("region", "US-WEST-2");
        let Resolution::Ready(resolved) = resolve(&findings_tool(), &step, &defaults) else {
            panic!("expected ready");
        };
        assert_eq!(resolved.arguments["region"], json!("us-west-2"));
        assert_eq!(resolved.arguments["service"], json!("inspector"));
        // Only the explicit sticky value is written back
        assert_eq!(resolved.sticky_updates.len(), 1);
        assert_eq!(resolved.sticky_updates["region"], json!("us-west-2"));
    }

    #[test]
    fn test_invalid_inherited_value_falls_back_to_default() {
        let mut defaults = IndexMap::new();
        // Sticky from a cost tool where any service name is allowed
        defaults.insert("service".to_string(), json!("all"));

        let step = CallPlanStep::new(StepId(0), "get_security_findings");
        let Resolution::Ready(resolved) = resolve(&findings_tool(), &step, &defaults) else {
            panic!("expected ready");
        };
        assert_eq!(resolved.arguments["service"], json!("guardduty"));
    }

    #[test]
    fn test_invalid_explicit_value() {
        let step = CallPlanStep::new(StepId(0), "get_security_findings").with_literal("limit", 5000);
        let Resolution::Invalid(errors) = resolve(&findings_tool(), &step, &IndexMap::new()) else {
            panic!("expected invalid");
        };
        assert!(errors[0].contains("between 1 and 1000"));
    }

    #[test]
    fn test_unknown_argument_is_invalid() {
        let step = CallPlanStep::new(StepId(0), "get_security_findings").with_literal("colour", "red");
        assert!(matches!(
            resolve(&findings_tool(), &step, &IndexMap::new()),
            Resolution::Invalid(_)
        ));
    }

    #[test]
    fn test_missing_required_parameter() {
        let step = CallPlanStep::new(StepId(0), "calculate_security_roi");
        assert_eq!(
            resolve(&roi_tool(), &step, &IndexMap::new()),
            Resolution::Missing(vec!["time_window".to_string()])
        );
    }

    #[test]
    fn test_unresolved_placeholder_uses_session() {
        let mut defaults = IndexMap::new();
        defaults.insert("time_window".to_string(), json!("2026-09-01/2026-09-30"));
        let step = CallPlanStep::new(StepId(0), "calculate_security_roi")
            .with_unresolved("time_window", "that period");

        let Resolution::Ready(resolved) = resolve(&roi_tool(), &step, &defaults) else {
            panic!("expected ready");
        };
        assert_eq!(resolved.arguments["time_window"], json!("2026-09-01/2026-09-30"));
        assert!(resolved.sticky_updates.is_empty());
    }

    #[test]
    fn test_upstream_binding() {
        let step = CallPlanStep::new(StepId(1), "calculate_security_roi")
            .with_literal("time_window", "2026-09-01/2026-09-30")
            .with_step_output("security_costs", StepId(0), "/total_cost");
        let mut upstream = HashMap::new();
        upstream.insert(StepId(0), json!({"total_cost": 125.5}));

        let resolution = ParameterResolver::new().resolve(&roi_tool(), &step, &IndexMap::new(), &upstream);
        let Resolution::Ready(resolved) = resolution else {
            panic!("expected ready");
        };
        assert_eq!(resolved.arguments["security_costs"], json!(125.5));
        // Derived values never become sticky
        assert!(!resolved.sticky_updates.contains_key("security_costs"));
        assert!(resolved.sticky_updates.contains_key("time_window"));
    }

    #[test]
    fn test_upstream_pointer_miss_is_invalid() {
        let step = CallPlanStep::new(StepId(1), "calculate_security_roi")
            .with_literal("time_window", "2026-09-01/2026-09-30")
            .with_step_output("security_costs", StepId(0), "/total_cost");
        let mut upstream = HashMap::new();
        upstream.insert(StepId(0), json!({"forecast": 10}));

        let resolution = ParameterResolver::new().resolve(&roi_tool(), &step, &IndexMap::new(), &upstream);
        assert!(matches!(resolution, Resolution::Invalid(_)));
    }
}
