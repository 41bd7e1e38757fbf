//! SSRF endpoint validation for sub-agent URLs.

use reqwest::Url;
use thiserror::Error;

/// Hostnames that resolve to cloud metadata services and must never be reachable
/// as sub-agent endpoints.
const DENIED_HOSTS: &[&str] = &["metadata.google.internal", "169.254.169.254"];

/// Error returned when an endpoint fails the SSRF policy check.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The URL could not be parsed.
    #[error("invalid endpoint URL '{0}'")]
    InvalidUrl(String),
    /// The URL scheme is neither `http` nor `https`.
    #[error("endpoint '{0}' uses unsupported scheme (must be http or https)")]
    UnsupportedScheme(String),
    /// The URL has no hostname component.
    #[error("endpoint '{0}' has no hostname")]
    MissingHost(String),
    /// The hostname resolves to a denied metadata/link-local service.
    #[error("endpoint '{0}' targets a blocked host ('{1}')")]
    Blocked(String, String),
}

/// Validate that `endpoint` is safe to use as a sub-agent base URL.
///
/// Rejects non-`http(s)` schemes, missing hosts, and the cloud-metadata
/// deny list (`169.254.169.254`, `metadata.google.internal`, and any host
/// beginning with `169.254.`). Localhost and RFC1918 private ranges are
/// allowed: sub-agents are expected to run on internal infrastructure.
pub fn validate_endpoint(endpoint: &str) -> Result<Url, EndpointError> {
    let url =
        Url::parse(endpoint).map_err(|_err| EndpointError::InvalidUrl(endpoint.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EndpointError::UnsupportedScheme(endpoint.to_string()));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| EndpointError::MissingHost(endpoint.to_string()))?;

    let host_lower = host.to_ascii_lowercase();
    if DENIED_HOSTS.contains(&host_lower.as_str()) || host_lower.starts_with("169.254.") {
        return Err(EndpointError::Blocked(endpoint.to_string(), host.to_string()));
    }

    Ok(url)
}
