//! Tool domain module
//!
//! Static catalog of the analytical tools the orchestrator can call.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────────┐    ┌──────────────────────┐
//! │ ToolRegistry   │───▶│ ToolDescriptor   │───▶│ ToolInvocationResult │
//! │ (lookup/list)  │    │ (ParamSpec map)  │    │ (write-once outcome) │
//! └──────┬─────────┘    └──────────────────┘    └──────────────────────┘
//!        │
//!        ├─ aliases: "security_status" → "check_security_services"
//!        └─ tools:   "get_cost_breakdown" → ToolDescriptor
//! ```
//!
//! Descriptors are immutable once the registry is built; the registry is
//! shared read-only behind an `Arc`. Values bound to parameters are checked by
//! a [`SchemaValidator`] before any network call is made.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{ParamSpec, ParamType, ParamValidator, ToolDescriptor, ToolDomain, ToolRegistry};
pub use traits::{DefaultSchemaValidator, SchemaValidator, is_region_code};
pub use value_objects::{FailureKind, InvocationStatus, ToolInvocationResult};
