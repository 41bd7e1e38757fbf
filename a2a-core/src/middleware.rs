//! Server-side loop-prevention middleware for inbound A2A requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::context::CallContext;

/// Default maximum inbound call depth before a request is rejected.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 5;

/// Loop-prevention policy for one gateway instance.
#[derive(Debug, Clone)]
pub struct LoopPrevention {
    /// This process's own agent name, as it appears in the call chain.
    pub self_name: String,
    /// Maximum allowed inbound call depth.
    pub max_call_depth: u32,
    /// Whether A2A loop prevention is enabled at all; when `false` or
    /// `self_name` is empty, every request passes through untouched.
    pub enabled: bool,
}

impl LoopPrevention {
    /// Build a policy for `self_name` with the default max call depth.
    #[must_use]
    pub fn new(self_name: impl Into<String>) -> Self {
        let self_name = self_name.into();
        let enabled = !self_name.is_empty();
        Self {
            self_name,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            enabled,
        }
    }

    fn loop_detected_response(&self) -> Response {
        (
            StatusCode::from_u16(508).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(json!({
                "success": false,
                "error": format!(
                    "Loop detected: agent '{}' is already in the call chain",
                    self.self_name
                ),
            })),
        )
            .into_response()
    }

    fn depth_exceeded_response(&self) -> Response {
        (
            StatusCode::from_u16(508).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(json!({
                "success": false,
                "error": "Max call depth exceeded",
            })),
        )
            .into_response()
    }
}

/// Axum middleware entry point: extracts the inbound [`CallContext`], checks
/// for cycles and excessive depth, and attaches the updated context (with
/// `self_name` appended) to the request extensions for downstream handlers.
pub async fn loop_prevention(
    axum::extract::State(policy): axum::extract::State<std::sync::Arc<LoopPrevention>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !policy.enabled {
        return next.run(request).await;
    }

    let reqwest_headers = to_reqwest_headers(request.headers());
    let ctx = CallContext::extract_from_headers(&reqwest_headers);

    if ctx.contains_agent(&policy.self_name) {
        return policy.loop_detected_response();
    }
    if ctx.call_depth() >= policy.max_call_depth {
        return policy.depth_exceeded_response();
    }

    let updated = ctx.add_agent(policy.self_name.clone());
    request.extensions_mut().insert(updated);
    next.run(request).await
}

fn to_reqwest_headers(headers: &axum::http::HeaderMap) -> reqwest::header::HeaderMap {
    let mut out = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        if let Ok(name) = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()) {
            if let Ok(value) = reqwest::header::HeaderValue::from_bytes(value.as_bytes()) {
                out.insert(name, value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_self_name_is_empty() {
        let policy = LoopPrevention::new("");
        assert!(!policy.enabled);
    }

    #[test]
    fn enabled_with_nonempty_self_name() {
        let policy = LoopPrevention::new("gateway-a");
        assert!(policy.enabled);
        assert_eq!(policy.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }
}
