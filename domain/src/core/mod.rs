//! Core domain concepts shared across all subdomains.
//!
//! - [`time_window::TimeWindow`] — concrete reporting interval for cost / ROI tools
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — phrase normalisation and truncation helpers

pub mod error;
pub mod string;
pub mod time_window;
