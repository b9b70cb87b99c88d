//! Invocation bridge – typed, single-call layer over a [`Transport`].
//!
//! Two flavours are exposed for every command:
//!
//! - `invoke` / `invoke_with` return [`BridgeError`]; transport failures
//!   come back untouched inside [`BridgeError::Transport`].
//! - `try_invoke` / `try_invoke_with` return [`InvokeError`], which also
//!   records the command that failed, for callers composing several calls.

use crate::commands::{Command, CommandDescriptor, CommandName, ShapeError, UnknownCommand};
use crate::transport::{Transport, TransportError};
use crate::types::{ErrorCode, ErrorInfo};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("response does not match declared shape: {0}")]
    Schema(#[from] ShapeError),
    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            BridgeError::Transport(TransportError::Rejected(_)) => ErrorCode::BackendRejected,
            BridgeError::Transport(TransportError::Unavailable(_)) => ErrorCode::Unavailable,
            BridgeError::Transport(TransportError::Io(_)) => ErrorCode::IoError,
            BridgeError::Transport(TransportError::Protocol(_)) => ErrorCode::ProtocolError,
            BridgeError::UnknownCommand(_) => ErrorCode::UnknownCommand,
            BridgeError::InvalidArgs(_) => ErrorCode::InvalidInput,
            BridgeError::Schema(_) => ErrorCode::SchemaMismatch,
            BridgeError::Decode(_) => ErrorCode::DecodeError,
        }
    }

    /// Details worth shipping alongside the message, e.g. the backend's
    /// own error payload.
    fn details(&self) -> Value {
        match self {
            BridgeError::Transport(TransportError::Rejected(payload)) => payload.clone(),
            BridgeError::Schema(e) => serde_json::json!({
                "path": e.path,
                "expected": e.expected,
                "found": e.found,
            }),
            _ => Value::Null,
        }
    }
}

/// A failed invocation together with the command that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{command} failed: {cause}")]
pub struct InvokeError {
    pub command: String,
    #[source]
    pub cause: BridgeError,
}

impl InvokeError {
    pub fn new(command: impl Into<String>, cause: BridgeError) -> Self {
        Self {
            command: command.into(),
            cause,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.cause.error_code()
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.error_code(),
            message: self.to_string(),
            details: self.cause.details(),
        }
    }
}

/// Marker for registry commands that require an argument object.
pub trait TakesArgs: Command {}

#[derive(Clone)]
pub struct Bridge {
    transport: Arc<dyn Transport>,
    validate_responses: bool,
}

impl Bridge {
    /// Bridge with response validation enabled.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            validate_responses: true,
        }
    }

    pub fn with_response_validation(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    pub fn validates_responses(&self) -> bool {
        self.validate_responses
    }

    /// Invoke a command that takes no arguments.
    pub async fn invoke<C>(&self) -> Result<C::Output, BridgeError>
    where
        C: Command<Args = ()>,
    {
        self.dispatch::<C>(None).await
    }

    /// Invoke a command with its declared argument type.
    pub async fn invoke_with<C>(&self, args: C::Args) -> Result<C::Output, BridgeError>
    where
        C: TakesArgs,
    {
        let value =
            serde_json::to_value(&args).map_err(|e| BridgeError::InvalidArgs(e.to_string()))?;
        let value = check_args(C::descriptor(), Some(value))?;
        self.dispatch::<C>(value).await
    }

    /// Like [`Bridge::invoke`], but the failure names the command.
    pub async fn try_invoke<C>(&self) -> Result<C::Output, InvokeError>
    where
        C: Command<Args = ()>,
    {
        self.invoke::<C>()
            .await
            .map_err(|cause| InvokeError::new(C::NAME.as_str(), cause))
    }

    /// Like [`Bridge::invoke_with`], but the failure names the command.
    pub async fn try_invoke_with<C>(&self, args: C::Args) -> Result<C::Output, InvokeError>
    where
        C: TakesArgs,
    {
        self.invoke_with::<C>(args)
            .await
            .map_err(|cause| InvokeError::new(C::NAME.as_str(), cause))
    }

    /// Invoke a command by its wire name with untyped JSON arguments.
    ///
    /// The name must belong to the registry and the arguments must match the
    /// declared argument shape; neither failure reaches the transport.
    pub async fn call(&self, name: &str, args: Option<Value>) -> Result<Value, InvokeError> {
        let wrap = |cause: BridgeError| InvokeError::new(name, cause);

        let command: CommandName = name.parse().map_err(|e: UnknownCommand| wrap(e.into()))?;
        let descriptor = command.descriptor();
        let args = check_args(descriptor, args).map_err(wrap)?;
        self.send(descriptor, args).await.map_err(wrap)
    }

    async fn dispatch<C: Command>(&self, args: Option<Value>) -> Result<C::Output, BridgeError> {
        let value = self.send(C::descriptor(), args).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(
        &self,
        descriptor: &'static CommandDescriptor,
        args: Option<Value>,
    ) -> Result<Value, BridgeError> {
        let name = descriptor.name.as_str();
        tracing::debug!(command = name, has_args = args.is_some(), "invoking backend command");

        let value = match self.transport.invoke(name, args).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(command = name, error = %e, "backend command failed");
                return Err(e.into());
            }
        };

        if self.validate_responses {
            if let Err(e) = descriptor.returns.validate(&value) {
                tracing::warn!(command = name, error = %e, "backend response failed validation");
                return Err(e.into());
            }
        }
        Ok(value)
    }
}

/// Match caller-supplied arguments against the descriptor. Commands without
/// arguments accept nothing, `null`, or an empty object.
fn check_args(
    descriptor: &CommandDescriptor,
    args: Option<Value>,
) -> Result<Option<Value>, BridgeError> {
    let name = descriptor.name.as_str();
    match (&descriptor.args, args) {
        (None, None) | (None, Some(Value::Null)) => Ok(None),
        (None, Some(Value::Object(map))) if map.is_empty() => Ok(None),
        (None, Some(_)) => Err(BridgeError::InvalidArgs(format!(
            "{} takes no arguments",
            name
        ))),
        (Some(_), None) | (Some(_), Some(Value::Null)) => Err(BridgeError::InvalidArgs(format!(
            "{} requires arguments",
            name
        ))),
        (Some(shape), Some(value)) => {
            if !value.is_object() {
                return Err(BridgeError::InvalidArgs(format!(
                    "{} arguments must be an object",
                    name
                )));
            }
            shape
                .validate(&value)
                .map_err(|e| BridgeError::InvalidArgs(e.to_string()))?;
            Ok(Some(value))
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
