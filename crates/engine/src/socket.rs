//! Line-delimited JSON protocol over a Unix socket.
//!
//! [`serve`] exposes a backend [`Transport`] to other processes;
//! [`SocketTransport`] is the matching client. Each client invocation opens
//! one connection and sends exactly one request.

use crate::commands::describe_registry;
use crate::transport::{Transport, TransportError, TransportResult};
use crate::types::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct SocketTransport {
    path: PathBuf,
}

impl SocketTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Transport for SocketTransport {
    async fn invoke(&self, command: &str, args: Option<Value>) -> TransportResult<Value> {
        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            TransportError::Unavailable(format!("cannot connect to {}: {}", self.path.display(), e))
        })?;
        let (reader, mut writer) = stream.into_split();

        let request = DaemonRequest {
            id: new_run_id(),
            method: "invoke".into(),
            params: json!({ "cmd": command, "args": args }),
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| TransportError::Protocol(format!("cannot encode request: {}", e)))?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.shutdown().await?;

        let reply = BufReader::new(reader)
            .lines()
            .next_line()
            .await?
            .ok_or_else(|| TransportError::Protocol("daemon closed connection without replying".into()))?;
        let response: DaemonResponse = serde_json::from_str(&reply)
            .map_err(|e| TransportError::Protocol(format!("invalid response: {}", e)))?;

        if response.id != request.id {
            return Err(TransportError::Protocol(format!(
                "response id {} does not match request id {}",
                response.id, request.id
            )));
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(TransportError::Rejected(
                serde_json::to_value(&error).unwrap_or(Value::Null),
            )),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(Value::Null),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Accept connections forever, answering requests from `backend`.
pub async fn serve(listener: UnixListener, backend: Arc<dyn Transport>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, backend.as_ref()).await {
                        tracing::warn!(error = %e, "daemon connection failed");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept error");
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, backend: &dyn Transport) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let response = handle_request(&line, backend).await;
        let mut resp_json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".into());
        resp_json.push('\n');
        writer.write_all(resp_json.as_bytes()).await?;
    }
    Ok(())
}

pub async fn handle_request(line: &str, backend: &dyn Transport) -> DaemonResponse {
    let req: DaemonRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                "unknown".into(),
                ErrorCode::InvalidInput,
                format!("invalid JSON request: {}", e),
                Value::Null,
            );
        }
    };
    tracing::debug!(id = %req.id, method = %req.method, "daemon request");

    match req.method.as_str() {
        "invoke" => {
            let Some(cmd) = req.params.get("cmd").and_then(Value::as_str) else {
                return error_response(
                    req.id,
                    ErrorCode::InvalidInput,
                    "missing 'cmd' string param".into(),
                    Value::Null,
                );
            };
            let args = req.params.get("args").filter(|a| !a.is_null()).cloned();
            match backend.invoke(cmd, args).await {
                Ok(value) => DaemonResponse {
                    id: req.id,
                    result: Some(value),
                    error: None,
                },
                Err(TransportError::Rejected(payload)) => {
                    let message = payload
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| payload.to_string());
                    error_response(req.id, ErrorCode::BackendRejected, message, payload)
                }
                Err(e) => error_response(req.id, ErrorCode::InternalError, e.to_string(), Value::Null),
            }
        }
        "list" => {
            DaemonResponse {
                id: req.id,
                result: Some(describe_registry()),
                error: None,
            }
        }
        other => error_response(
            req.id,
            ErrorCode::InvalidInput,
            format!("unknown method: {}", other),
            Value::Null,
        ),
    }
}

fn error_response(id: String, code: ErrorCode, message: String, details: Value) -> DaemonResponse {
    DaemonResponse {
        id,
        result: None,
        error: Some(ErrorInfo {
            code,
            message,
            details,
        }),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
