//! Turns a set of sub-agent configs into a callable tool collection: one
//! `query_<name>` tool per agent, plus a `query_multiple_agents` fan-out
//! tool once there are at least two.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{ClientExtensions, SubAgentClient};
use crate::config::SubAgentConfig;
use crate::context::CallContext;
use crate::error::GatewayError;
use crate::executor::{self, Call, CallResult};

/// A tool's JSON description, as exposed to an LLM-driven caller.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Tool name (`query_<name>` or `query_multiple_agents`).
    pub name: String,
    /// Human-readable description, derived from the remote agent card.
    pub description: String,
    /// JSON schema for the tool's input.
    pub input_schema: Value,
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Deserialize)]
struct QueryMultipleArgs {
    queries: Vec<AgentQuery>,
}

#[derive(Deserialize)]
struct AgentQuery {
    agent: String,
    query: String,
}

/// A single-agent query result, as returned to the tool caller.
#[derive(Debug, Serialize)]
struct QueryResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl QueryResponse {
    fn ok(response: String) -> Value {
        serde_json::to_value(Self {
            success: true,
            response: Some(response),
            error: None,
        })
        .unwrap_or(Value::Null)
    }

    fn err(error: String) -> Value {
        serde_json::to_value(Self {
            success: false,
            response: None,
            error: Some(error),
        })
        .unwrap_or(Value::Null)
    }
}

/// Sanitize a sub-agent name into a tool-name suffix: dashes become
/// underscores.
fn sanitize_tool_suffix(name: &str) -> String {
    name.replace('-', "_")
}

/// A built collection of sub-agent clients and their derived tools.
pub struct ToolSet {
    clients: HashMap<String, Arc<SubAgentClient>>,
    descriptors: Vec<ToolDescriptor>,
    max_concurrency: usize,
}

impl ToolSet {
    /// Build a toolset from `configs`, running C2/C3/card-discovery for each.
    /// A single sub-agent's construction failure is logged and that agent is
    /// skipped; it never aborts the others.
    pub async fn build(
        configs: &[SubAgentConfig],
        extensions: &ClientExtensions,
        max_concurrency: usize,
    ) -> Self {
        let mut clients = HashMap::new();
        let mut descriptors = Vec::new();

        for config in configs {
            match SubAgentClient::build(config, extensions).await {
                Ok(client) => {
                    descriptors.push(ToolDescriptor {
                        name: format!("query_{}", sanitize_tool_suffix(client.name())),
                        description: client.description().to_string(),
                        input_schema: json!({
                            "type": "object",
                            "properties": {
                                "query": { "type": "string", "description": "The question or instruction to send to this sub-agent" }
                            },
                            "required": ["query"]
                        }),
                    });
                    clients.insert(config.name.clone(), Arc::new(client));
                }
                Err(err) => {
                    tracing::error!(agent = %config.name, error = %err, "failed to construct sub-agent client, skipping");
                }
            }
        }

        if clients.len() >= 2 {
            let mut agent_names: Vec<&str> = clients.keys().map(String::as_str).collect();
            agent_names.sort_unstable();
            descriptors.push(ToolDescriptor {
                name: "query_multiple_agents".to_string(),
                description: format!(
                    "Query multiple sub-agents in parallel. Available agents: {}",
                    agent_names.join(", ")
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "queries": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "agent": { "type": "string" },
                                    "query": { "type": "string" }
                                },
                                "required": ["agent", "query"]
                            }
                        }
                    },
                    "required": ["queries"]
                }),
            });
        }

        Self {
            clients,
            descriptors,
            max_concurrency,
        }
    }

    /// The tool descriptors this toolset exposes.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Whether `tool_name` is registered.
    #[must_use]
    pub fn contains(&self, tool_name: &str) -> bool {
        self.descriptors.iter().any(|d| d.name == tool_name)
    }

    /// Invoke `tool_name` with raw JSON `args` under `ctx`.
    pub async fn call(&self, tool_name: &str, ctx: &CallContext, args: Value) -> Result<Value, GatewayError> {
        if tool_name == "query_multiple_agents" {
            return self.call_query_multiple(ctx, args).await;
        }

        let agent_name = self
            .clients
            .keys()
            .find(|name| format!("query_{}", sanitize_tool_suffix(name)) == tool_name)
            .ok_or_else(|| GatewayError::InvalidInput(format!("unknown tool '{tool_name}'")))?
            .clone();

        let args: QueryArgs = serde_json::from_value(args)?;
        Ok(self.call_single(&agent_name, ctx, args.query).await)
    }

    async fn call_single(&self, agent_name: &str, ctx: &CallContext, query: String) -> Value {
        if query.trim().is_empty() {
            return QueryResponse::err("query cannot be empty".to_string());
        }

        let Some(client) = self.clients.get(agent_name) else {
            return QueryResponse::err(self.unknown_agent_message(agent_name));
        };

        match client.query(ctx, &query).await {
            Ok(response) => QueryResponse::ok(response),
            Err(err) => QueryResponse::err(err.to_string()),
        }
    }

    fn unknown_agent_message(&self, agent_name: &str) -> String {
        let mut available: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        available.sort_unstable();
        format!("agent '{agent_name}' not found. Available: [{}]", available.join(", "))
    }

    async fn call_query_multiple(&self, ctx: &CallContext, args: Value) -> Result<Value, GatewayError> {
        let args: QueryMultipleArgs = serde_json::from_value(args)?;
        let total = args.queries.len();

        let mut slots: Vec<Option<CallResult>> = (0..total).map(|_| None).collect();
        let mut indices = Vec::with_capacity(total);
        let mut calls = Vec::with_capacity(total);

        for (index, item) in args.queries.into_iter().enumerate() {
            if item.query.trim().is_empty() {
                slots[index] = Some(CallResult {
                    agent: item.agent,
                    outcome: Err(GatewayError::InvalidInput("query cannot be empty".to_string())),
                });
                continue;
            }
            let Some(client) = self.clients.get(&item.agent).cloned() else {
                let message = self.unknown_agent_message(&item.agent);
                slots[index] = Some(CallResult {
                    agent: item.agent,
                    outcome: Err(GatewayError::InvalidInput(message)),
                });
                continue;
            };

            let ctx = ctx.clone();
            let agent = item.agent;
            let query = item.query;
            indices.push(index);
            calls.push(Call::new(agent, async move { client.query(&ctx, &query).await }));
        }

        let executed = executor::execute_bounded(calls, self.max_concurrency).await;
        for (index, result) in indices.into_iter().zip(executed) {
            slots[index] = Some(result);
        }

        let mut successful = 0usize;
        let results: Vec<Value> = slots
            .into_iter()
            .map(|slot| {
                let CallResult { agent, outcome } = slot.expect("every slot is filled exactly once above");
                match outcome {
                    Ok(response) => {
                        successful += 1;
                        json!({ "agent": agent, "success": true, "response": response })
                    }
                    Err(err) => json!({ "agent": agent, "success": false, "error": err.to_string() }),
                }
            })
            .collect();

        Ok(json!({
            "results": results,
            "total": total,
            "successful": successful,
            "failed": total - successful,
        }))
    }

    /// Close every constructed client, collecting per-client errors rather
    /// than failing on the first one.
    pub async fn close(&self) -> Vec<GatewayError> {
        let mut errors = Vec::new();
        for client in self.clients.values() {
            if let Err(err) = client.close().await {
                errors.push(err);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_tool_suffix_replaces_dashes() {
        assert_eq!(sanitize_tool_suffix("billing-agent"), "billing_agent");
    }

    #[test]
    fn query_response_ok_serializes_success_true() {
        let value = QueryResponse::ok("hi".to_string());
        assert_eq!(value["success"], true);
        assert_eq!(value["response"], "hi");
    }

    #[test]
    fn query_response_err_serializes_success_false() {
        let value = QueryResponse::err("bad".to_string());
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "bad");
    }

    #[tokio::test]
    async fn call_query_multiple_preserves_submission_order_and_counts() {
        let toolset = ToolSet {
            clients: HashMap::new(),
            descriptors: Vec::new(),
            max_concurrency: 5,
        };
        let ctx = CallContext::new();
        let args = json!({
            "queries": [
                { "agent": "billing", "query": "what is my balance" },
                { "agent": "shipping", "query": "" },
            ]
        });

        let result = toolset.call_query_multiple(&ctx, args).await.unwrap();
        assert_eq!(result["total"], 2);
        assert_eq!(result["successful"], 0);
        assert_eq!(result["failed"], 2);

        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["agent"], "billing");
        assert_eq!(results[0]["success"], false);
        assert_eq!(results[1]["agent"], "shipping");
        assert_eq!(results[1]["success"], false);
    }
}
