//! Tool catalog overrides from TOML (`[tools]` section)

use super::ConfigValidationError;
use insights_domain::ToolDomain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// # Example
///
/// ```toml
/// [tools.backends]
/// roi = "https://roi.internal.example.com/invoke"
///
/// [tools.aliases]
/// posture = "check_security_services"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// Backend address per domain ("security", "cost", "roi")
    pub backends: HashMap<String, String>,
    /// Extra alias → canonical tool name mappings
    pub aliases: HashMap<String, String>,
}

impl FileToolsConfig {
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut domains: Vec<&String> = self.backends.keys().collect();
        domains.sort();
        domains
            .into_iter()
            .filter(|domain| domain.parse::<ToolDomain>().is_err())
            .map(|domain| ConfigValidationError::InvalidValue {
                field: "tools.backends".to_string(),
                value: domain.clone(),
                expected: ToolDomain::ALL.iter().map(|d| d.as_str().to_string()).collect(),
            })
            .collect()
    }

    /// Backend overrides keyed by canonical domain name.
    pub fn backend_overrides(&self) -> HashMap<String, String> {
        self.backends
            .iter()
            .filter_map(|(domain, address)| {
                domain
                    .parse::<ToolDomain>()
                    .ok()
                    .map(|d| (d.as_str().to_string(), address.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_section_deserialize() {
        let toml_str = r#"
[tools.backends]
Costs = "http://cost.internal"
billing = "http://billing.internal"

[tools.aliases]
posture = "check_security_services"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let overrides = config.tools.backend_overrides();
        assert_eq!(overrides.get("cost").map(String::as_str), Some("http://cost.internal"));
        assert_eq!(overrides.len(), 1);
        assert_eq!(config.tools.aliases["posture"], "check_security_services");

        let issues = config.tools.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("billing"));
    }
}
