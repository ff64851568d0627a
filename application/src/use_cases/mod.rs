//! Use cases (application services)

pub mod dispatch_plan;
pub mod handle_turn;
