//! Tool catalog for the security, cost and ROI tool-servers
//!
//! - `catalog`: the default descriptors and registry builder
//! - `schema`: JSON Schema export for tool listings

pub mod catalog;
pub mod schema;

pub use catalog::{DEFAULT_ALIASES, backend_address, build_registry, default_descriptors};
pub use schema::{registry_schema, tool_to_schema};
