//! Infrastructure layer for exec-insights
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: tool-server gateways, the default tool
//! catalog, configuration file loading and the turn transcript.

pub mod config;
pub mod gateway;
pub mod logging;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileDispatchConfig, FileGatewayConfig,
    FileLoggingConfig, FileOutputConfig, FileSessionConfig, FileToolsConfig, GatewayMode,
    InvalidConfig,
};
pub use gateway::{DEFAULT_USER_AGENT, FixtureToolGateway, HttpGatewayError, HttpToolGateway};
pub use logging::JsonlTurnLogger;
pub use tools::{build_registry, registry_schema, tool_to_schema};
