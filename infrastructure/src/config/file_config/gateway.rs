//! Gateway configuration from TOML (`[gateway]` section)

use super::ConfigValidationError;
use crate::gateway::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};

/// Which gateway adapter serves tool calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayMode {
    /// HTTP calls to the tool-servers
    #[default]
    Http,
    /// Canned offline payloads
    Fixture,
}

impl std::str::FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(GatewayMode::Http),
            "fixture" | "offline" => Ok(GatewayMode::Fixture),
            other => Err(format!("unknown gateway mode: {}", other)),
        }
    }
}

/// Raw gateway configuration from TOML
///
/// # Example
///
/// ```toml
/// [gateway]
/// base_url = "https://api.example.com/prod"
/// mode = "http"            # "http" or "fixture"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Base URL; each tool-server is at `<base_url>/<domain>`
    pub base_url: String,
    /// "http" or "fixture"
    pub mode: String,
    pub user_agent: String,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            mode: "http".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FileGatewayConfig {
    /// Parse `mode`, falling back to HTTP.
    pub fn parse_mode(&self) -> (GatewayMode, Vec<ConfigValidationError>) {
        match self.mode.parse::<GatewayMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => (
                GatewayMode::default(),
                vec![ConfigValidationError::InvalidValue {
                    field: "gateway.mode".to_string(),
                    value: self.mode.clone(),
                    expected: vec!["http".to_string(), "fixture".to_string()],
                }],
            ),
        }
    }

    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = self.parse_mode().1;
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            issues.push(ConfigValidationError::Invalid {
                field: "gateway.base_url".to_string(),
                message: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        let mut config = FileGatewayConfig::default();
        assert_eq!(config.parse_mode(), (GatewayMode::Http, vec![]));

        config.mode = "Fixture".to_string();
        assert_eq!(config.parse_mode().0, GatewayMode::Fixture);

        config.mode = "grpc".to_string();
        let (mode, issues) = config.parse_mode();
        assert_eq!(mode, GatewayMode::Http);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = FileGatewayConfig {
            base_url: "ftp://tools".to_string(),
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("gateway.base_url"));
    }
}
