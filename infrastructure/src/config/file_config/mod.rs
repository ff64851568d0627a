//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod dispatch;
mod gateway;
mod logging;
mod output;
mod session;
mod tools;

pub use dispatch::FileDispatchConfig;
pub use gateway::{FileGatewayConfig, GatewayMode};
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use session::FileSessionConfig;
pub use tools::FileToolsConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One problem found by [`FileConfig::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field}: unknown value '{value}' (expected one of: {})", .expected.join(", "))]
    InvalidValue {
        field: String,
        value: String,
        expected: Vec<String>,
    },

    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

/// A configuration rejected by [`FileConfig::ensure_valid`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfig(pub Vec<ConfigValidationError>);

impl std::fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid configuration")?;
        for issue in &self.0 {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidConfig {}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool-server gateway
    pub gateway: FileGatewayConfig,
    /// Dispatcher limits
    pub dispatch: FileDispatchConfig,
    /// Session store settings
    pub session: FileSessionConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Log file and transcript locations
    pub logging: FileLoggingConfig,
    /// Tool catalog overrides
    pub tools: FileToolsConfig,
}

impl FileConfig {
    /// Fail with every detected issue, if there are any.
    pub fn ensure_valid(&self) -> Result<(), InvalidConfig> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(InvalidConfig(issues))
        }
    }

    /// Validate the entire configuration, returning every detected issue.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        issues.extend(self.gateway.validate());
        issues.extend(self.dispatch.validate());
        issues.extend(self.session.validate());
        issues.extend(self.output.parse_style().1);
        issues.extend(self.tools.validate());

        // A turn may run for the whole plan timeout; the session must outlive it
        let plan_timeout_secs = self.dispatch.plan_timeout_ms.div_ceil(1000);
        if self.session.idle_ttl_secs != 0 && self.session.idle_ttl_secs <= plan_timeout_secs {
            issues.push(ConfigValidationError::Invalid {
                field: "session.idle_ttl_secs".to_string(),
                message: format!(
                    "idle TTL ({} s) must exceed the plan timeout ({} ms)",
                    self.session.idle_ttl_secs, self.dispatch.plan_timeout_ms
                ),
            });
        }
        issues
    }
}
