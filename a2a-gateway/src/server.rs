//! Axum HTTP server: exposes the toolset and this process's own agent card.

use std::sync::Arc;

use a2a_core::context::CallContext;
use a2a_core::middleware::{loop_prevention, LoopPrevention};
use a2a_core::prelude::{ClientExtensions, ToolSet};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::{GatewayProcessError, Result};
use crate::summarizer::TruncatingSummarizer;

/// Character budget applied by the query-extractor's truncation summarizer.
const QUERY_EXTRACTOR_MAX_CHARS: usize = 4000;

struct AppState {
    toolset: ToolSet,
    self_name: String,
    polling_enabled: bool,
}

/// Build the toolset from `config` and serve the gateway until shutdown.
pub async fn serve(config: Arc<GatewayConfig>) -> Result<()> {
    let extensions = ClientExtensions {
        retry_policy: config.retry.to_policy(),
        polling_enabled: config.polling_enabled,
        summarizer: config.query_extractor.enabled.then(|| {
            Arc::new(TruncatingSummarizer::new(
                QUERY_EXTRACTOR_MAX_CHARS,
                config.query_extractor.model.clone(),
            )) as Arc<dyn a2a_core::interceptor::Summarizer>
        }),
        ..ClientExtensions::default()
    };
    let toolset = ToolSet::build(&config.sub_agents, &extensions, config.max_concurrency).await;
    info!(tools = toolset.descriptors().len(), "toolset built");

    let state = Arc::new(AppState {
        toolset,
        self_name: config.self_name.clone(),
        polling_enabled: config.polling_enabled,
    });

    let mut policy = LoopPrevention::new(config.self_name.clone());
    policy.enabled = config.loop_prevention_enabled && policy.enabled;
    policy.max_call_depth = config.max_call_depth;
    let policy = Arc::new(policy);

    let app = Router::new()
        .route("/v1/tools/:tool_name", post(invoke_tool))
        .layer(axum::middleware::from_fn_with_state(policy, loop_prevention))
        .route("/.well-known/agent-card.json", get(agent_card))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|err| GatewayProcessError::Server(format!("failed to bind {}: {err}", config.bind_address)))?;
    info!(address = %config.bind_address, "a2a-gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| GatewayProcessError::Server(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Path(tool_name): Path<String>,
    request: axum::extract::Request,
) -> Response {
    let ctx = request
        .extensions()
        .get::<CallContext>()
        .cloned()
        .unwrap_or_else(CallContext::new);

    let (_, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, 10 * 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": format!("failed to read request body: {err}")})),
            )
                .into_response();
        }
    };
    let args: Value = if bytes.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"success": false, "error": format!("invalid JSON body: {err}")})),
                )
                    .into_response();
            }
        }
    };

    if !state.toolset.contains(&tool_name) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": format!("unknown tool '{tool_name}'")})),
        )
            .into_response();
    }

    match state.toolset.call(&tool_name, &ctx, args).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

async fn agent_card(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": state.self_name,
        "description": "Knowledge-agent gateway exposing sub-agent query tools",
        "capabilities": { "streaming": !state.polling_enabled },
        "tools": state.toolset.descriptors(),
    }))
}
