//! Convenience re-exports of the most commonly used types.
//!
//! ```rust
//! use a2a_core::prelude::*;
//!
//! let ctx = CallContext::new();
//! assert_eq!(ctx.call_depth(), 0);
//! ```

pub use crate::auth::Authenticator;
pub use crate::client::{ClientExtensions, SubAgentClient};
pub use crate::config::{AuthSpec, Protocol, SubAgentConfig};
pub use crate::context::CallContext;
pub use crate::error::{GatewayError, Result};
pub use crate::executor::{Call, CallResult};
pub use crate::guard::{validate_endpoint, EndpointError};
pub use crate::interceptor::{Interceptor, InterceptorChain};
pub use crate::metrics::Metrics;
pub use crate::middleware::LoopPrevention;
pub use crate::toolset::{ToolDescriptor, ToolSet};
pub use crate::transport::{RetryPolicy, SubAgentTransport};
