//! Query interpretation
//!
//! Turns a user turn into a [`CallPlan`](crate::plan::CallPlan):
//!
//! 1. Split the turn into clauses at conjunctions and dependency phrases
//!    ("based on", "using", "given").
//! 2. Classify each clause into a tool domain with the keyword tables in
//!    [`keywords`]; clauses without a domain attach to the neighbouring one.
//! 3. Pick the tool for each intent by sub-keyword cues.
//! 4. Fill parameters from the entities found by [`slots::Slots`].
//!
//! A turn with entities but no intent ("what about last month?") re-plans
//! the previous turn's tools with the new entities.

pub mod interpreter;
pub mod keywords;
pub mod slots;

pub use interpreter::{KeywordInterpreter, QueryInterpreter};
pub use slots::Slots;
