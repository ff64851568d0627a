//! Aggregation of step results into one answer.

pub mod entities;
pub mod synthesizer;

pub use entities::{AggregatedAnswer, Clarification, NarrativeStyle, UnavailableTool};
pub use synthesizer::{clarification_question, synthesize, tool_label};
