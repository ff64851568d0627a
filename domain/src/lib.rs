//! Domain layer for exec-insights
//!
//! This crate contains the orchestration core's business logic: the tool
//! catalog, call plans, query interpretation, parameter resolution, session
//! state and answer synthesis. It has no dependencies on infrastructure or
//! presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Call plan
//!
//! One user turn becomes a [`CallPlan`]: an ordered set of tool invocations
//! whose dependency edges form a DAG. Steps without edges run concurrently.
//!
//! ## Sticky parameters
//!
//! Values such as `region` or `time_window`, once given, persist in the
//! [`SessionContext`] and fill later turns until overridden.
//!
//! ## Degraded answers
//!
//! An [`AggregatedAnswer`] is always produced. When some tools fail it is
//! flagged `degraded` and names what is missing instead of inventing data.

pub mod answer;
pub mod config;
pub mod core;
pub mod intent;
pub mod params;
pub mod plan;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use answer::{AggregatedAnswer, Clarification, NarrativeStyle, UnavailableTool, synthesize};
pub use config::OutputFormat;
pub use core::{error::DomainError, string::truncate, time_window::TimeWindow};
pub use intent::{KeywordInterpreter, QueryInterpreter, Slots};
pub use params::{ParameterResolver, Resolution, ResolvedArguments};
pub use plan::{ArgValue, CallPlan, CallPlanStep, PlanTag, StepId, topological_order};
pub use session::{PendingClarification, SessionContext, TurnRecord};
pub use tool::{
    DefaultSchemaValidator, FailureKind, InvocationStatus, ParamSpec, ParamType, ParamValidator,
    SchemaValidator, ToolDescriptor, ToolDomain, ToolInvocationResult, ToolRegistry,
};
