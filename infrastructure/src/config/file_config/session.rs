//! Session configuration from TOML (`[session]` section)

use super::ConfigValidationError;
use insights_application::SessionParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Idle sessions older than this are evicted
    pub idle_ttl_secs: u64,
    /// Turns kept in session history
    pub history_limit: usize,
    pub janitor_interval_secs: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        let params = SessionParams::default();
        Self {
            idle_ttl_secs: params.idle_ttl.as_secs(),
            history_limit: params.history_limit,
            janitor_interval_secs: params.janitor_interval.as_secs(),
        }
    }
}

impl FileSessionConfig {
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        [
            ("session.idle_ttl_secs", self.idle_ttl_secs),
            ("session.history_limit", self.history_limit as u64),
            ("session.janitor_interval_secs", self.janitor_interval_secs),
        ]
        .into_iter()
        .filter(|(_, value)| *value == 0)
        .map(|(field, _)| ConfigValidationError::Zero {
            field: field.to_string(),
        })
        .collect()
    }

    pub fn to_params(&self) -> SessionParams {
        SessionParams::default()
            .with_idle_ttl(Duration::from_secs(self.idle_ttl_secs))
            .with_history_limit(self.history_limit)
            .with_janitor_interval(Duration::from_secs(self.janitor_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_params() {
        let config = FileSessionConfig {
            idle_ttl_secs: 120,
            history_limit: 3,
            janitor_interval_secs: 15,
        };
        let params = config.to_params();
        assert_eq!(params.idle_ttl, Duration::from_secs(120));
        assert_eq!(params.history_limit, 3);
        assert_eq!(params.janitor_interval, Duration::from_secs(15));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_zero_history_limit_reported() {
        let config = FileSessionConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            vec![ConfigValidationError::Zero {
                field: "session.history_limit".to_string()
            }]
        );
    }
}
