use crate::miners::data::Endpoint;
use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
pub(crate) mod mock;
pub mod web;

/// Transport to one device.
///
/// Implementations own retries and timeouts; callers treat every error the same
/// way, as "this endpoint is unavailable".
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch the payload of a telemetry endpoint.
    async fn send_command(&self, endpoint: Endpoint) -> Result<Value, ApiError>;

    /// Send a state-changing command, with an optional parameter.
    async fn send_action(
        &self,
        command: &'static str,
        param: Option<Value>,
    ) -> Result<Value, ApiError>;
}

/// Error types for device API operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Network error (connection issues, DNS resolution, etc.)
    #[error("network error: {0}")]
    Network(String),
    /// HTTP error with status code
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Response body could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
    /// Request building error
    #[error("request error: {0}")]
    Request(String),
    /// Timeout error
    #[error("request timeout")]
    Timeout,
    /// The device answered, but refused the command
    #[error("rejected by device: {0}")]
    Rejected(String),
    /// The transport does not speak this endpoint group
    #[error("unsupported endpoint group: {0}")]
    UnsupportedGroup(&'static str),
}
