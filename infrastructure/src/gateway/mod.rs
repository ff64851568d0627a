//! Gateway Client adapters
//!
//! - [`HttpToolGateway`]: talks to the tool-servers over HTTP
//! - [`FixtureToolGateway`]: canned payloads for offline use

pub mod fixture;
pub mod http;

pub use fixture::FixtureToolGateway;
pub use http::{DEFAULT_USER_AGENT, HttpGatewayError, HttpToolGateway, classify_status, normalize_payload};
