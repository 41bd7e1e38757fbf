#![cfg_attr(docsrs, feature(doc_cfg))]
//! Agent-to-agent orchestration core: call-context propagation, endpoint
//! validation, auth resolution, an interceptor chain, pluggable sub-agent
//! transports, a toolset builder, a parallel executor, and server-side
//! loop-prevention middleware.

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod guard;
pub mod interceptor;
pub mod metrics;
pub mod middleware;
pub mod prelude;
pub mod toolset;
pub mod transport;

pub use error::{GatewayError, Result};
