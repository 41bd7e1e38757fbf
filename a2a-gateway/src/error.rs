//! Gateway-process error type.

use thiserror::Error;

/// A type alias for `Result<T, GatewayProcessError>`.
pub type Result<T> = std::result::Result<T, GatewayProcessError>;

/// Errors surfaced by the `a2a-gateway` binary itself, distinct from
/// [`a2a_core::GatewayError`] which covers per-call sub-agent failures.
#[derive(Debug, Error)]
pub enum GatewayProcessError {
    /// Configuration file could not be read or parsed.
    #[error("failed to load configuration from '{path}': {message}")]
    ConfigLoad {
        /// Path that was read.
        path: String,
        /// Underlying error description.
        message: String,
    },

    /// Configuration failed validation.
    #[error("configuration is invalid: {0}")]
    ConfigInvalid(String),

    /// The HTTP server failed to bind or serve.
    #[error("server error: {0}")]
    Server(String),

    /// Wrapped sub-agent orchestration error.
    #[error(transparent)]
    Gateway(#[from] a2a_core::GatewayError),

    /// Wrapped I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_load_error_mentions_path() {
        let err = GatewayProcessError::ConfigLoad {
            path: "/etc/a2a-gateway.toml".to_string(),
            message: "not found".to_string(),
        };
        assert!(err.to_string().contains("/etc/a2a-gateway.toml"));
    }
}
