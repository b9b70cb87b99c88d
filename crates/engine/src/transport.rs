//! Backend transport boundary.
//!
//! The bridge sits on top of a single primitive: invoke a command by name
//! with an optional argument object and get back a JSON value or a failure.

use serde_json::Value;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The backend ran the command and returned an error payload.
    #[error("backend rejected call: {0}")]
    Rejected(Value),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one backend call.
    async fn invoke(&self, command: &str, args: Option<Value>) -> TransportResult<Value>;
}
