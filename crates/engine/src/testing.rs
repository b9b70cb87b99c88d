//! In-memory transports for unit tests.

use crate::transport::{Transport, TransportError, TransportResult};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Answers every command from a fixed table. Queued failures are consumed
/// before the fixed answer is used.
#[derive(Default)]
pub struct MockTransport {
    answers: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, VecDeque<TransportError>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command: &str, value: Value) {
        self.answers
            .lock()
            .unwrap()
            .insert(command.to_string(), value);
    }

    pub fn fail(&self, command: &str, error: TransportError) {
        self.failures
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn invoke(&self, command: &str, args: Option<Value>) -> TransportResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args));

        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(command)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        self.answers
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .ok_or_else(|| TransportError::Unavailable(format!("no answer for {}", command)))
    }
}

/// Holds one command's calls open until the test releases them, so tests
/// can pick the order in which overlapping calls resolve. Every other
/// command is answered by the inner mock.
pub struct GatedTransport {
    gated: String,
    pending: Mutex<Vec<Option<oneshot::Sender<Value>>>>,
    pub inner: MockTransport,
}

impl GatedTransport {
    pub fn new(gated: &str) -> Self {
        Self {
            gated: gated.to_string(),
            pending: Mutex::new(Vec::new()),
            inner: MockTransport::new(),
        }
    }

    /// Number of gated calls issued so far.
    pub fn issued(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Resolve the `n`th gated call (in issue order) with `value`.
    pub fn release(&self, n: usize, value: Value) {
        let sender = self.pending.lock().unwrap()[n]
            .take()
            .expect("gated call already released");
        let _ = sender.send(value);
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    async fn invoke(&self, command: &str, args: Option<Value>) -> TransportResult<Value> {
        if command != self.gated {
            return self.inner.invoke(command, args).await;
        }

        let rx = {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push(Some(tx));
            rx
        };
        rx.await
            .map_err(|_| TransportError::Unavailable("gate dropped".into()))
    }
}
