//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`DispatchParams`] — plan dispatch control (concurrency, timeouts, retry backoff)
//! - [`SessionParams`] — session lifetime (idle TTL, history size, janitor cadence)

pub mod dispatch_params;
pub mod session_params;

pub use dispatch_params::DispatchParams;
pub use session_params::SessionParams;
