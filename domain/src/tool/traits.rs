//! Tool domain traits
//!
//! Contains pure domain logic for parameter schema validation.
//! The async `ToolGateway` port is defined in the application layer (ports).

use super::entities::{ParamSpec, ParamType, ParamValidator};
use crate::core::time_window::TimeWindow;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static REGION_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(us|eu|ap|sa|ca|me|af|il|mx)(-gov)?-(north|south|east|west|central|northeast|northwest|southeast|southwest)-\d$").ok()
});

/// Validator for parameter values
///
/// This is a pure domain trait that checks a single value against its
/// [`ParamSpec`] without any I/O. On success it returns the canonical form of
/// the value (e.g. enum options in their declared spelling, integers parsed
/// from numeric strings).
pub trait SchemaValidator {
    fn check(&self, spec: &ParamSpec, value: &Value) -> Result<Value, String>;
}

/// Type check followed by the optional [`ParamValidator`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaValidator;

impl SchemaValidator for DefaultSchemaValidator {
    fn check(&self, spec: &ParamSpec, value: &Value) -> Result<Value, String> {
        let typed = check_type(spec, value)?;
        match &spec.validator {
            None => Ok(typed),
            Some(validator) => check_validator(spec, validator, typed),
        }
    }
}

fn check_type(spec: &ParamSpec, value: &Value) -> Result<Value, String> {
    let mismatch = || {
        format!(
            "parameter '{}' expects {}, got {}",
            spec.name,
            spec.param_type.as_str(),
            value
        )
    };

    match spec.param_type {
        ParamType::String => value
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Value::String(s.trim().to_string()))
            .ok_or_else(mismatch),
        ParamType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| Value::from(f as i64))
                .ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Ok(Value::Bool(true)),
                "false" | "no" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        ParamType::StringList => match value {
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
                Ok(value.clone())
            }
            // A single string is accepted as a one-element list
            Value::String(s) if !s.trim().is_empty() => {
                Ok(Value::Array(vec![Value::String(s.trim().to_string())]))
            }
            _ => Err(mismatch()),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        ParamType::TimeWindow => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            raw.parse::<TimeWindow>()
                .map(|w| Value::String(w.to_string()))
                .map_err(|e| format!("parameter '{}': {}", spec.name, e))
        }
    }
}

fn check_validator(spec: &ParamSpec, validator: &ParamValidator, value: Value) -> Result<Value, String> {
    match validator {
        ParamValidator::OneOf(options) => {
            let canonical = |s: &str| {
                options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(s))
                    .map(|o| Value::String(o.clone()))
                    .ok_or_else(|| {
                        format!(
                            "parameter '{}' must be one of [{}], got '{}'",
                            spec.name,
                            options.join(", "),
                            s
                        )
                    })
            };
            match &value {
                Value::String(s) => canonical(s),
                Value::Array(items) => items
                    .iter()
                    .map(|item| canonical(item.as_str().unwrap_or_default()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(format!("parameter '{}' has no enumerable value", spec.name)),
            }
        }
        ParamValidator::Range { min, max } => {
            let n = value
                .as_f64()
                .ok_or_else(|| format!("parameter '{}' is not numeric", spec.name))?;
            if n < *min || n > *max {
                Err(format!(
                    "parameter '{}' must be between {} and {}, got {}",
                    spec.name, min, max, n
                ))
            } else {
                Ok(value)
            }
        }
        ParamValidator::Region => {
            let check_one = |s: &str| {
                let lowered = s.to_lowercase();
                let valid = REGION_PATTERN
                    .as_ref()
                    .is_some_and(|re| re.is_match(&lowered));
                if valid {
                    Ok(Value::String(lowered))
                } else {
                    Err(format!("parameter '{}' is not an AWS region: '{}'", spec.name, s))
                }
            };
            match &value {
                Value::String(s) => check_one(s),
                Value::Array(items) => items
                    .iter()
                    .map(|item| check_one(item.as_str().unwrap_or_default()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(format!("parameter '{}' is not an AWS region", spec.name)),
            }
        }
    }
}

/// Whether `code` looks like an AWS region code.
pub fn is_region_code(code: &str) -> bool {
    REGION_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(&code.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(param_type: ParamType) -> ParamSpec {
        ParamSpec::new("p", "test", param_type)
    }

    #[test]
    fn test_region_pattern_compiles() {
        assert!(REGION_PATTERN.is_some());
    }

    #[test]
    fn test_string_is_trimmed_and_non_empty() {
        let v = DefaultSchemaValidator;
        assert_eq!(v.check(&spec(ParamType::String), &json!("  all ")).unwrap(), json!("all"));
        assert!(v.check(&spec(ParamType::String), &json!("   ")).is_err());
        assert!(v.check(&spec(ParamType::String), &json!(3)).is_err());
    }

    #[test]
    fn test_integer_accepts_numeric_strings() {
        let v = DefaultSchemaValidator;
        assert_eq!(v.check(&spec(ParamType::Integer), &json!("6")).unwrap(), json!(6));
        assert_eq!(v.check(&spec(ParamType::Integer), &json!(3.0)).unwrap(), json!(3));
        assert!(v.check(&spec(ParamType::Integer), &json!(2.5)).is_err());
    }

    #[test]
    fn test_one_of_canonicalises_case() {
        let v = DefaultSchemaValidator;
        let s = spec(ParamType::String).one_of(&["DAILY", "MONTHLY"]);
        assert_eq!(v.check(&s, &json!("monthly")).unwrap(), json!("MONTHLY"));
        let err = v.check(&s, &json!("hourly")).unwrap_err();
        assert!(err.contains("must be one of"));
    }

    #[test]
    fn test_one_of_on_lists() {
        let v = DefaultSchemaValidator;
        let s = spec(ParamType::StringList).one_of(&["guardduty", "securityhub"]);
        assert_eq!(
            v.check(&s, &json!(["GuardDuty", "securityhub"])).unwrap(),
            json!(["guardduty", "securityhub"])
        );
        assert_eq!(v.check(&s, &json!("guardduty")).unwrap(), json!(["guardduty"]));
        assert!(v.check(&s, &json!(["macie"])).is_err());
    }

    #[test]
    fn test_range() {
        let v = DefaultSchemaValidator;
        let s = spec(ParamType::Integer).with_validator(ParamValidator::Range { min: 1.0, max: 12.0 });
        assert!(v.check(&s, &json!(12)).is_ok());
        assert!(v.check(&s, &json!(13)).is_err());
        assert!(v.check(&s, &json!(0)).is_err());
    }

    #[test]
    fn test_region() {
        let v = DefaultSchemaValidator;
        let s = spec(ParamType::String).with_validator(ParamValidator::Region);
        assert_eq!(v.check(&s, &json!("US-West-2")).unwrap(), json!("us-west-2"));
        assert!(v.check(&s, &json!("mars-north-1")).is_err());
        assert!(is_region_code("ap-southeast-1"));
        assert!(is_region_code("us-gov-west-1"));
        assert!(!is_region_code("us-west"));
    }

    #[test]
    fn test_time_window() {
        let v = DefaultSchemaValidator;
        let s = spec(ParamType::TimeWindow);
        assert_eq!(
            v.check(&s, &json!("2026-09-01/2026-09-30")).unwrap(),
            json!("2026-09-01/2026-09-30")
        );
        assert!(v.check(&s, &json!("last month")).is_err());
        assert!(v.check(&s, &json!(30)).is_err());
    }

    #[test]
    fn test_object_and_boolean() {
        let v = DefaultSchemaValidator;
        assert!(v.check(&spec(ParamType::Object), &json!({"a": 1})).is_ok());
        assert!(v.check(&spec(ParamType::Object), &json!([1])).is_err());
        assert_eq!(v.check(&spec(ParamType::Boolean), &json!("yes")).unwrap(), json!(true));
    }
}
