//! Call-context propagation for loop detection and request correlation.
//!
//! [`CallContext`] carries a request id, the ordered chain of agent names
//! already traversed, and the current call depth across A2A hops. It is
//! immutable: every mutating method returns a new value rather than
//! modifying `self`, so a caller can never accidentally observe another
//! hop's context.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

/// `X-Request-ID` header name.
pub const HEADER_REQUEST_ID: &str = "X-Request-ID";
/// `X-Call-Chain` header name.
pub const HEADER_CALL_CHAIN: &str = "X-Call-Chain";
/// `X-Call-Depth` header name.
pub const HEADER_CALL_DEPTH: &str = "X-Call-Depth";

/// Immutable per-hop call context.
///
/// # Example
///
/// ```
/// use a2a_core::context::CallContext;
///
/// let ctx = CallContext::new();
/// let next = ctx.add_agent("billing-agent");
///
/// assert!(next.contains_agent("Billing-Agent"));
/// assert_eq!(next.call_depth(), 1);
/// assert_eq!(ctx.call_depth(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: Arc<str>,
    call_chain: Arc<[String]>,
    call_depth: u32,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Create a fresh context with a newly generated request id and an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Arc::from(Uuid::new_v4().to_string()),
            call_chain: Arc::from([]),
            call_depth: 0,
        }
    }

    /// Parse a context from inbound request headers.
    ///
    /// A missing or empty `X-Request-ID` is replaced by a freshly generated
    /// UUID. `X-Call-Chain` is split on `,`, each element trimmed, empty
    /// elements discarded. `X-Call-Depth` is parsed as a non-negative
    /// integer; a missing, unparseable, or negative value becomes `0`.
    #[must_use]
    pub fn extract_from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(HEADER_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

        let call_chain: Vec<String> = headers
            .get(HEADER_CALL_CHAIN)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let call_depth = headers
            .get(HEADER_CALL_DEPTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(0, |d| u32::try_from(d).unwrap_or(0));

        Self {
            request_id: Arc::from(request_id),
            call_chain: Arc::from(call_chain),
            call_depth,
        }
    }

    /// The request id, propagated unchanged across every hop of a call chain.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The ordered list of agent names already traversed, in insertion order.
    #[must_use]
    pub fn call_chain(&self) -> &[String] {
        &self.call_chain
    }

    /// The current call depth.
    #[must_use]
    pub const fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Whether `name` is already present in the call chain (case-insensitive).
    #[must_use]
    pub fn contains_agent(&self, name: &str) -> bool {
        self.call_chain
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(name))
    }

    /// Return a new context with `name` appended to the chain and the depth
    /// incremented. `self` is left unmodified.
    #[must_use]
    pub fn add_agent(&self, name: impl Into<String>) -> Self {
        let mut chain: Vec<String> = self.call_chain.to_vec();
        chain.push(name.into());
        Self {
            request_id: Arc::clone(&self.request_id),
            call_chain: Arc::from(chain),
            call_depth: self.call_depth + 1,
        }
    }

    /// Write this context onto an outbound header map.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        if let Ok(v) = HeaderValue::from_str(&self.request_id) {
            headers.insert(HeaderName::from_static("x-request-id"), v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.call_chain.join(",")) {
            headers.insert(HeaderName::from_static("x-call-chain"), v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.call_depth.to_string()) {
            headers.insert(HeaderName::from_static("x-call-depth"), v);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod construction {
        use super::*;

        #[test]
        fn new_is_empty() {
            let ctx = CallContext::new();
            assert!(ctx.call_chain().is_empty());
            assert_eq!(ctx.call_depth(), 0);
            assert!(!ctx.request_id().is_empty());
        }

        #[test]
        fn default_matches_new() {
            let ctx = CallContext::default();
            assert_eq!(ctx.call_depth(), 0);
        }
    }

    mod header_extraction {
        use super::*;

        fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
            let mut map = HeaderMap::new();
            for (k, v) in pairs {
                map.insert(
                    HeaderName::from_bytes(k.as_bytes()).unwrap(),
                    HeaderValue::from_str(v).unwrap(),
                );
            }
            map
        }

        #[test]
        fn missing_request_id_is_generated() {
            let ctx = CallContext::extract_from_headers(&headers(&[]));
            assert!(!ctx.request_id().is_empty());
        }

        #[test]
        fn chain_is_split_and_trimmed() {
            let ctx = CallContext::extract_from_headers(&headers(&[(
                "x-call-chain",
                "agent-a, agent-b ,, agent-c",
            )]));
            assert_eq!(ctx.call_chain(), ["agent-a", "agent-b", "agent-c"]);
        }

        #[test]
        fn negative_depth_coerces_to_zero() {
            let ctx = CallContext::extract_from_headers(&headers(&[("x-call-depth", "-7")]));
            assert_eq!(ctx.call_depth(), 0);
        }

        #[test]
        fn unparseable_depth_coerces_to_zero() {
            let ctx = CallContext::extract_from_headers(&headers(&[("x-call-depth", "abc")]));
            assert_eq!(ctx.call_depth(), 0);
        }

        #[test]
        fn valid_depth_is_parsed() {
            let ctx = CallContext::extract_from_headers(&headers(&[("x-call-depth", "3")]));
            assert_eq!(ctx.call_depth(), 3);
        }
    }

    mod chain_mutation {
        use super::*;

        #[test]
        fn add_agent_is_immutable() {
            let ctx = CallContext::new();
            let next = ctx.add_agent("agent-a");

            assert!(ctx.call_chain().is_empty());
            assert_eq!(ctx.call_depth(), 0);

            assert_eq!(next.call_chain(), ["agent-a"]);
            assert_eq!(next.call_depth(), 1);
        }

        #[test]
        fn add_agent_preserves_request_id() {
            let ctx = CallContext::new();
            let next = ctx.add_agent("agent-a");
            assert_eq!(ctx.request_id(), next.request_id());
        }

        #[test]
        fn contains_agent_is_case_insensitive() {
            let ctx = CallContext::new().add_agent("Billing-Agent");
            assert!(ctx.contains_agent("billing-agent"));
            assert!(ctx.contains_agent("BILLING-AGENT"));
        }
    }

    mod header_roundtrip {
        use super::*;

        #[test]
        fn write_then_extract_preserves_chain_and_depth() {
            let ctx = CallContext::new().add_agent("a").add_agent("b");
            let mut headers = HeaderMap::new();
            ctx.write_headers(&mut headers);

            let parsed = CallContext::extract_from_headers(&headers);
            assert_eq!(parsed.call_chain(), ctx.call_chain());
            assert_eq!(parsed.call_depth(), ctx.call_depth());
            assert_eq!(parsed.request_id(), ctx.request_id());
        }
    }
}
