//! Error types for the orchestration core.

use thiserror::Error;

/// A type alias for `Result<T, GatewayError>`.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// The main error type for sub-agent orchestration operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Sub-agent configuration was invalid (missing env var, bad URL, non-HTTPS OAuth2 token URL).
    #[error("invalid configuration for sub-agent '{agent}': {message}")]
    ConfigInvalid {
        /// Name of the sub-agent whose configuration failed.
        agent: String,
        /// Description of the configuration issue.
        message: String,
    },

    /// The configured endpoint failed the SSRF policy check.
    #[error("endpoint blocked for sub-agent '{agent}': {0}", agent = .agent)]
    EndpointBlocked {
        /// Name of the sub-agent.
        agent: String,
        /// The underlying guard error.
        #[source]
        source: crate::guard::EndpointError,
    },

    /// A transport-level error classified as recoverable (network/DNS/timeout/cancel).
    #[error("sub-agent '{agent}' is unavailable: {message}")]
    TransportRecoverable {
        /// Name of the sub-agent.
        agent: String,
        /// Human-readable classification of the failure.
        message: String,
    },

    /// A transport-level error not eligible for graceful degradation.
    #[error("sub-agent '{agent}' request failed: {message}")]
    TransportFatal {
        /// Name of the sub-agent.
        agent: String,
        /// The underlying error message.
        message: String,
    },

    /// A non-200/non-508 HTTP response from a sub-agent.
    #[error("sub-agent '{agent}' returned HTTP {status}")]
    RemoteHttpError {
        /// Name of the sub-agent.
        agent: String,
        /// The HTTP status code observed.
        status: u16,
    },

    /// This process detected a cyclic or over-deep inbound call.
    #[error("{0}")]
    LoopDetected(String),

    /// The ambient operation was cancelled or exceeded its deadline.
    #[error("operation cancelled or timed out for sub-agent '{agent}'")]
    CancelledOrDeadline {
        /// Name of the sub-agent.
        agent: String,
    },

    /// Tool-boundary input validation failure (empty query, unknown agent name).
    #[error("{0}")]
    InvalidInput(String),

    /// Wrapped HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wrapped JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether this error is eligible for conversion into a synthetic
    /// in-band success payload by the error-recovery interceptor.
    ///
    /// Recoverable errors are network/DNS/connection/timeout classes, or an
    /// explicit cancellation/deadline. Everything else — bad configuration,
    /// SSRF rejection, loop detection, malformed input — propagates as a
    /// hard failure.
    #[must_use]
    pub const fn recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransportRecoverable { .. } | Self::CancelledOrDeadline { .. }
        )
    }

    /// Classify a [`reqwest::Error`] as a [`GatewayError`] for a given sub-agent,
    /// routing network/timeout/connect failures into the recoverable variant.
    #[must_use]
    pub fn from_reqwest(agent: impl Into<String>, err: &reqwest::Error) -> Self {
        let agent = agent.into();
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::TransportRecoverable {
                agent,
                message: classify_reqwest_message(err),
            }
        } else {
            Self::TransportFatal {
                agent,
                message: err.to_string(),
            }
        }
    }
}

fn classify_reqwest_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection refused or host unreachable".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_recoverable_is_recoverable() {
        let err = GatewayError::TransportRecoverable {
            agent: "billing".into(),
            message: "connection refused".into(),
        };
        assert!(err.recoverable());
    }

    #[test]
    fn cancelled_is_recoverable() {
        let err = GatewayError::CancelledOrDeadline {
            agent: "billing".into(),
        };
        assert!(err.recoverable());
    }

    #[test]
    fn config_invalid_is_not_recoverable() {
        let err = GatewayError::ConfigInvalid {
            agent: "billing".into(),
            message: "missing env var".into(),
        };
        assert!(!err.recoverable());
    }

    #[test]
    fn loop_detected_is_not_recoverable() {
        let err = GatewayError::LoopDetected("agent already in chain".into());
        assert!(!err.recoverable());
    }
}
