//! Configuration file loading for exec-insights
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `INSIGHTS_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./insights.toml` or `./.insights.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/exec-insights/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDispatchConfig, FileGatewayConfig, FileLoggingConfig,
    FileOutputConfig, FileSessionConfig, FileToolsConfig, GatewayMode,
    InvalidConfig,
};
pub use loader::ConfigLoader;
