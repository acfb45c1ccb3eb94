//! Trait abstraction over the gateway transport.
//!
//! Every component funnels its network traffic through [`GatewayTransport`],
//! so tests can substitute a scripted transport for [`HttpTransport`].
//!
//! [`HttpTransport`]: crate::transport::HttpTransport

use {async_trait::async_trait, serde_json::Value};

use crate::types::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// JSON request/response channel to the gateway.
///
/// Implementations never retry. Failures are classified into
/// [`TransportError`] before they leave the implementation.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Send one request and return the decoded JSON body.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError>;

    /// Base URL every request is resolved against.
    fn base_url(&self) -> &str;
}
