//! REST transport with format-tolerant response parsing.
//!
//! Unlike the A2A transport, REST sub-agents are not expected to speak a
//! single canonical wire format. The response parser probes a
//! priority-ordered list of field names rather than requiring one schema.

use async_trait::async_trait;
use serde_json::Value;

use super::{truncate_response, SubAgentTransport};
use crate::context::CallContext;
use crate::error::GatewayError;
use crate::interceptor::{Exchange, ExchangeState, InterceptorChain, OutboundRequest};

/// Read-size cap before a response is even considered for parsing (10 MiB).
const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

const ERROR_FIELDS: &[&str] = &["error", "error_message", "err"];
const SUCCESS_FIELDS: &[&str] = &["success", "ok", "status"];
const ANSWER_FIELDS: &[&str] = &[
    "answer", "response", "text", "result", "output", "content", "data", "message",
];

/// REST transport for one sub-agent.
pub struct RestTransport {
    agent: String,
    url: String,
    http: reqwest::Client,
    chain: InterceptorChain,
    /// REST intentionally omits `X-Session-Id` by default; set to `true` to
    /// propagate it anyway.
    propagate_session_id: bool,
}

impl RestTransport {
    /// Build a transport for `agent` posting to `url` (`<endpoint><api_path>`).
    #[must_use]
    pub fn new(
        agent: impl Into<String>,
        url: impl Into<String>,
        http: reqwest::Client,
        chain: InterceptorChain,
        propagate_session_id: bool,
    ) -> Self {
        Self {
            agent: agent.into(),
            url: url.into(),
            http,
            chain,
            propagate_session_id,
        }
    }
}

#[async_trait]
impl SubAgentTransport for RestTransport {
    async fn query(&self, ctx: &CallContext, text: &str) -> Result<String, GatewayError> {
        let mut exchange = Exchange {
            agent: &self.agent,
            call_context: ctx,
            state: ExchangeState::default(),
            propagate_session_id: self.propagate_session_id,
        };
        let mut request = OutboundRequest::new(text);
        ctx.write_headers(&mut request.headers);

        if let Err(err) = self.chain.run_before(&mut exchange, &mut request).await {
            let mut outcome: Result<String, GatewayError> = Err(err);
            self.chain.run_after(&mut exchange, &mut outcome).await;
            return outcome;
        }

        let mut outcome = self.post(&request).await;
        self.chain.run_after(&mut exchange, &mut outcome).await;
        outcome
    }
}

impl RestTransport {
    async fn post(&self, request: &OutboundRequest) -> Result<String, GatewayError> {
        let mut body = serde_json::json!({
            "query": request.text,
            "channel_id": "a2a-rest",
        });
        if self.propagate_session_id {
            if let Some(session_id) = request.headers.get("x-session-id").and_then(|v| v.to_str().ok()) {
                body["session_id"] = Value::String(session_id.to_string());
            }
        }

        let response = self
            .http
            .post(&self.url)
            .headers(request.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        if !status.is_success() {
            return Err(GatewayError::RemoteHttpError {
                agent: self.agent.clone(),
                status: status.as_u16(),
            });
        }

        let capped = if bytes.len() > MAX_RESPONSE_BYTES {
            &bytes[..MAX_RESPONSE_BYTES]
        } else {
            &bytes[..]
        };

        parse_tolerant(capped, &self.agent).map(truncate_response)
    }
}

/// Parse a REST response body tolerantly: probe error fields, then success
/// fields, then answer fields (one level of nesting deep); fall back to
/// pretty-printing the whole JSON value, or the raw bytes if not JSON at all.
fn parse_tolerant(bytes: &[u8], agent: &str) -> Result<String, GatewayError> {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    };

    if let Some(error_text) = probe_fields(&value, ERROR_FIELDS) {
        return Err(GatewayError::TransportFatal {
            agent: agent.to_string(),
            message: error_text,
        });
    }

    if let Some(status_value) = probe_raw_fields(&value, SUCCESS_FIELDS) {
        if is_falsey(status_value) {
            let message = probe_fields(&value, ANSWER_FIELDS)
                .unwrap_or_else(|| "sub-agent reported failure with no message".to_string());
            return Err(GatewayError::TransportFatal {
                agent: agent.to_string(),
                message,
            });
        }
    }

    if let Some(answer) = probe_fields(&value, ANSWER_FIELDS) {
        return Ok(answer);
    }

    Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
}

fn is_falsey(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::String(s) => {
            matches!(s.to_ascii_lowercase().as_str(), "false" | "error" | "failed" | "failure")
        }
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Probe `fields` against `value` in priority order, stringifying the first
/// hit (descending one level into a nested object first).
fn probe_fields(value: &Value, fields: &[&str]) -> Option<String> {
    for field in fields {
        if let Some(found) = value.get(field) {
            if let Some(s) = found.as_str() {
                return Some(s.to_string());
            }
            if found.is_object() {
                for nested_field in fields {
                    if let Some(nested) = found.get(nested_field).and_then(Value::as_str) {
                        return Some(nested.to_string());
                    }
                }
                return Some(found.to_string());
            }
            if !found.is_null() {
                return Some(found.to_string());
            }
        }
    }
    None
}

fn probe_raw_fields<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| value.get(field))
}
