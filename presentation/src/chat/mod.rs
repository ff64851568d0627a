//! Interactive chat module
//!
//! Provides a line-editor chat interface bound to one session.

mod repl;

pub use repl::{ChatRepl, CommandResult, ReplCommand};
