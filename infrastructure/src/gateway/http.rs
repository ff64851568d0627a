//! HTTP gateway to the tool-servers.
//!
//! Each call is a `POST` of `{"tool_name": ..., "arguments": {...}}` to the
//! tool's backend address. Tool-servers answer either directly with
//! `{"tool_name": ..., "result": "<json text>"}` or wrapped in a function
//! envelope `{"statusCode": 200, "body": "<json text>"}`; both shapes are
//! unwrapped by [`normalize_payload`].

use async_trait::async_trait;
use insights_application::ports::tool_gateway::{GatewayFailure, InvocationRequest, ToolGateway};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = concat!("exec-insights/", env!("CARGO_PKG_VERSION"));

/// Longest error body quoted in a failure detail
const MAX_ERROR_BODY: usize = 200;

#[derive(Error, Debug)]
pub enum HttpGatewayError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Gateway speaking the tool-server HTTP request shape.
#[derive(Debug, Clone)]
pub struct HttpToolGateway {
    client: reqwest::Client,
}

impl HttpToolGateway {
    pub fn new(user_agent: &str) -> Result<Self, HttpGatewayError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<Value, GatewayFailure> {
        let body = json!({
            "tool_name": request.tool_name,
            "arguments": request.arguments,
        });
        debug!("POST {} ({})", request.backend_address, request.tool_name);

        let response = self
            .client
            .post(&request.backend_address)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayFailure::transient(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|e| GatewayFailure::protocol(format!("response is not JSON: {}", e)))?;
        normalize_payload(envelope)
    }
}

fn classify_send_error(error: reqwest::Error) -> GatewayFailure {
    if error.is_timeout() {
        GatewayFailure::timeout(format!("request timed out: {}", error))
    } else {
        GatewayFailure::transient(format!("request failed: {}", error))
    }
}

/// Map a non-success HTTP status to a failure class.
///
/// 5xx, 408 and 429 are transient; any other 4xx is a domain rejection.
pub fn classify_status(status: u16, body: &str) -> GatewayFailure {
    let detail = format!(
        "HTTP {}{}",
        status,
        error_message(body)
            .map(|m| format!(": {}", m))
            .unwrap_or_default()
    );
    match status {
        408 => GatewayFailure::timeout(detail),
        429 | 500..=599 => GatewayFailure::transient(detail),
        _ => GatewayFailure::domain(detail),
    }
}

/// `error` field of a JSON error body, or the raw body truncated.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let message = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| trimmed.to_string());
    Some(insights_domain::truncate(&message, MAX_ERROR_BODY))
}

/// Parse a string that should hold JSON; plain text is wrapped as `{"text": ...}`.
fn parse_embedded(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => json!({ "text": text }),
    }
}

/// Unwrap tool-server envelopes down to the tool payload.
pub fn normalize_payload(envelope: Value) -> Result<Value, GatewayFailure> {
    let envelope = match envelope.get("statusCode").and_then(Value::as_u64) {
        Some(code) => {
            let body = match envelope.get("body") {
                Some(Value::String(text)) => parse_embedded(text),
                Some(other) => other.clone(),
                None => Value::Null,
            };
            if !(200..300).contains(&code) {
                let body_text = body.to_string();
                let status = u16::try_from(code).map_err(|_| {
                    GatewayFailure::protocol(format!("invalid statusCode {}", code))
                })?;
                return Err(classify_status(status, &body_text));
            }
            body
        }
        None => envelope,
    };

    match envelope.get("result") {
        Some(Value::String(text)) => Ok(parse_embedded(text)),
        Some(result) => Ok(result.clone()),
        None => match envelope.get("error") {
            Some(error) => Err(GatewayFailure::domain(
                error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()),
            )),
            None if envelope.is_object() => Ok(envelope),
            None => Err(GatewayFailure::protocol(format!(
                "unexpected response shape: {}",
                insights_domain::truncate(&envelope.to_string(), MAX_ERROR_BODY)
            ))),
        },
    }
}
