//! Dispatch configuration from TOML (`[dispatch]` section)

use super::ConfigValidationError;
use insights_application::DispatchParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw dispatcher limits from TOML
///
/// # Example
///
/// ```toml
/// [dispatch]
/// max_in_flight = 4
/// step_timeout_ms = 25000
/// plan_timeout_ms = 60000
/// retry_backoff_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    pub max_in_flight: usize,
    pub step_timeout_ms: u64,
    pub plan_timeout_ms: u64,
    pub retry_backoff_ms: u64,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        let params = DispatchParams::default();
        Self {
            max_in_flight: params.max_in_flight,
            step_timeout_ms: params.step_timeout.as_millis() as u64,
            plan_timeout_ms: params.plan_timeout.as_millis() as u64,
            retry_backoff_ms: params.retry_backoff.as_millis() as u64,
        }
    }
}

impl FileDispatchConfig {
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        for (field, value) in [
            ("dispatch.max_in_flight", self.max_in_flight as u64),
            ("dispatch.step_timeout_ms", self.step_timeout_ms),
            ("dispatch.plan_timeout_ms", self.plan_timeout_ms),
        ] {
            if value == 0 {
                issues.push(ConfigValidationError::Zero {
                    field: field.to_string(),
                });
            }
        }
        if self.step_timeout_ms > self.plan_timeout_ms {
            issues.push(ConfigValidationError::Invalid {
                field: "dispatch.step_timeout_ms".to_string(),
                message: format!(
                    "step timeout ({} ms) exceeds the plan timeout ({} ms)",
                    self.step_timeout_ms, self.plan_timeout_ms
                ),
            });
        }
        issues
    }

    pub fn to_params(&self) -> DispatchParams {
        DispatchParams::default()
            .with_max_in_flight(self.max_in_flight)
            .with_step_timeout(Duration::from_millis(self.step_timeout_ms))
            .with_plan_timeout(Duration::from_millis(self.plan_timeout_ms))
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params() {
        assert_eq!(FileDispatchConfig::default().to_params(), DispatchParams::default());
        assert!(FileDispatchConfig::default().validate().is_empty());
    }

    #[test]
    fn test_zero_values_reported() {
        let config = FileDispatchConfig {
            max_in_flight: 0,
            step_timeout_ms: 0,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(
            issues,
            vec![
                ConfigValidationError::Zero {
                    field: "dispatch.max_in_flight".to_string()
                },
                ConfigValidationError::Zero {
                    field: "dispatch.step_timeout_ms".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_step_longer_than_plan() {
        let config = FileDispatchConfig {
            step_timeout_ms: 90_000,
            plan_timeout_ms: 60_000,
            ..Default::default()
        };
        assert_eq!(config.validate().len(), 1);
    }
}
