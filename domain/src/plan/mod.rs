//! Call plans: ordered tool invocations forming a DAG.

pub mod dag;
pub mod entities;

pub use dag::topological_order;
pub use entities::{ArgValue, CallPlan, CallPlanStep, PlanTag, StepId};
