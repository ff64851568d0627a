//! Parameter resolution for plan steps.

pub mod resolver;

pub use resolver::{ParameterResolver, Resolution, ResolvedArguments};
