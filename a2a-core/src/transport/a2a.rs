//! A2A JSON-RPC 2.0 transport.
//!
//! Discovers the remote agent's card once at construction, then issues
//! `message/send`-style JSON-RPC requests per call. Per-request dynamic
//! headers (identity, auth) are injected by the interceptor chain, not by
//! this transport — hand-rolled over `reqwest` rather than a client builder
//! that only supports headers fixed once at construction time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::{truncate_response, SubAgentTransport};
use crate::context::CallContext;
use crate::error::GatewayError;
use crate::interceptor::{Exchange, ExchangeState, InterceptorChain, OutboundRequest};

const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";
const AGENT_CARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal agent-card fields this core actually consumes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentCard {
    /// Remote agent's self-reported name.
    #[serde(default)]
    pub name: String,
    /// Remote agent's self-description, used as the derived tool description
    /// and as the query-extractor's summarization context.
    #[serde(default)]
    pub description: String,
    /// Whether the remote agent advertises streaming support.
    #[serde(default)]
    pub capabilities: AgentCapabilities,
}

/// Capability flags advertised by an agent card.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming responses.
    #[serde(default)]
    pub streaming: bool,
}

/// Fetch the agent card at `<endpoint>/.well-known/agent-card.json`.
///
/// Never fails client construction: a fetch failure yields a default,
/// empty card so the caller can still register a tool with a generic
/// description.
pub async fn discover_agent_card(http: &reqwest::Client, endpoint: &str) -> AgentCard {
    let url = format!("{}{AGENT_CARD_PATH}", endpoint.trim_end_matches('/'));
    let result = tokio::time::timeout(AGENT_CARD_TIMEOUT, http.get(&url).send()).await;

    match result {
        Ok(Ok(response)) if response.status().is_success() => response
            .json::<AgentCard>()
            .await
            .inspect_err(|err| debug!(%url, %err, "agent card response was not valid JSON"))
            .unwrap_or_default(),
        Ok(Ok(response)) => {
            debug!(%url, status = %response.status(), "agent card fetch returned non-success status");
            AgentCard::default()
        }
        Ok(Err(err)) => {
            debug!(%url, %err, "agent card fetch failed");
            AgentCard::default()
        }
        Err(_) => {
            debug!(%url, "agent card fetch timed out");
            AgentCard::default()
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    message: String,
}

/// A2A transport for one sub-agent: a JSON-RPC client wrapped with the
/// interceptor chain.
pub struct A2aTransport {
    agent: String,
    endpoint: String,
    http: reqwest::Client,
    chain: InterceptorChain,
    /// Disables streaming in favor of synchronous polling; A2A's polling and
    /// streaming modes are mutually exclusive, so this is informational for
    /// now since this transport always issues a single blocking call.
    polling_enabled: bool,
}

impl A2aTransport {
    /// Build a transport for `agent` at `endpoint`, with the given
    /// interceptor chain already assembled by the toolset builder.
    #[must_use]
    pub fn new(
        agent: impl Into<String>,
        endpoint: impl Into<String>,
        http: reqwest::Client,
        chain: InterceptorChain,
        polling_enabled: bool,
    ) -> Self {
        Self {
            agent: agent.into(),
            endpoint: endpoint.into(),
            http,
            chain,
            polling_enabled,
        }
    }
}

#[async_trait]
impl SubAgentTransport for A2aTransport {
    async fn query(&self, ctx: &CallContext, text: &str) -> Result<String, GatewayError> {
        let mut exchange = Exchange {
            agent: &self.agent,
            call_context: ctx,
            state: ExchangeState::default(),
            propagate_session_id: true,
        };
        let mut request = OutboundRequest::new(text);
        ctx.write_headers(&mut request.headers);

        if let Err(err) = self.chain.run_before(&mut exchange, &mut request).await {
            let mut outcome: Result<String, GatewayError> = Err(err);
            self.chain.run_after(&mut exchange, &mut outcome).await;
            return outcome;
        }

        let mut outcome = self.send_rpc(&request.headers, &request.text).await;
        self.chain.run_after(&mut exchange, &mut outcome).await;
        outcome
    }
}

impl A2aTransport {
    async fn send_rpc(&self, headers: &HeaderMap, text: &str) -> Result<String, GatewayError> {
        let params = json!({
            "message": {
                "role": "user",
                "parts": [{ "text": text }],
            },
            "polling": self.polling_enabled,
        });
        let rpc_request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4().to_string(),
            method: "message/send",
            params,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .headers(headers.clone())
            .json(&rpc_request)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::RemoteHttpError {
                agent: self.agent.clone(),
                status: status.as_u16(),
            });
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::from_reqwest(&self.agent, &err))?;

        if let Some(error) = body.error {
            return Err(GatewayError::TransportFatal {
                agent: self.agent.clone(),
                message: error.message,
            });
        }

        let result = body.result.ok_or_else(|| GatewayError::TransportFatal {
            agent: self.agent.clone(),
            message: "JSON-RPC response had neither result nor error".to_string(),
        })?;

        Ok(truncate_response(extract_text(&result)))
    }
}

/// Extract text from a JSON-RPC result that is either a Message
/// (`{role, parts:[{text}]}`) or a Task (`status.message.parts` plus all
/// artifact parts), concatenating every text part with newlines.
fn extract_text(result: &Value) -> String {
    let mut parts = Vec::new();

    if let Some(message_parts) = result.get("parts").and_then(Value::as_array) {
        collect_text_parts(message_parts, &mut parts);
    }

    if let Some(status_parts) = result
        .pointer("/status/message/parts")
        .and_then(Value::as_array)
    {
        collect_text_parts(status_parts, &mut parts);
    }

    if let Some(artifacts) = result.get("artifacts").and_then(Value::as_array) {
        for artifact in artifacts {
            if let Some(artifact_parts) = artifact.get("parts").and_then(Value::as_array) {
                collect_text_parts(artifact_parts, &mut parts);
            }
        }
    }

    parts.join("\n")
}

fn collect_text_parts(parts: &[Value], out: &mut Vec<String>) {
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            out.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_from_message_result() {
        let result = json!({ "role": "agent", "parts": [{ "text": "hello" }] });
        assert_eq!(extract_text(&result), "hello");
    }

    #[test]
    fn extract_text_from_task_result_concatenates_status_and_artifacts() {
        let result = json!({
            "status": { "message": { "parts": [{ "text": "step 1" }] } },
            "artifacts": [
                { "parts": [{ "text": "step 2" }] },
                { "parts": [{ "text": "step 3" }] },
            ],
        });
        assert_eq!(extract_text(&result), "step 1\nstep 2\nstep 3");
    }

    #[test]
    fn extract_text_empty_result_is_empty_string() {
        assert_eq!(extract_text(&json!({})), "");
    }
}
