//! In-memory transport that replays queued responses and records every
//! request, for driving fetchers without a server.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{MetadataTransport, QueryParams, TransportError};

#[derive(Debug)]
enum Reply {
    Json(Value),
    Bytes(Vec<u8>),
    Error(TransportError),
}

#[derive(Debug)]
struct Scripted {
    reply: Reply,
    gate: Option<oneshot::Receiver<()>>,
}

/// One request seen by a [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub params: QueryParams,
}

impl RecordedRequest {
    /// Value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Responses are handed out in request order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Reply, gate: Option<oneshot::Receiver<()>>) {
        self.replies.lock().push_back(Scripted { reply, gate });
    }

    pub fn push_json(&self, body: Value) {
        self.push(Reply::Json(body), None);
    }

    pub fn push_bytes(&self, body: Vec<u8>) {
        self.push(Reply::Bytes(body), None);
    }

    pub fn push_error(&self, error: TransportError) {
        self.push(Reply::Error(error), None);
    }

    /// Queue a JSON response that is held back until the returned sender
    /// fires (or is dropped)
    pub fn push_gated_json(&self, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Json(body), Some(rx));
        tx
    }

    /// Every request made so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Responses not yet consumed
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }

    async fn take(&self, path: &str, params: &QueryParams) -> Result<Reply, TransportError> {
        self.requests.lock().push(RecordedRequest {
            path: path.to_string(),
            params: params.clone(),
        });
        let scripted = self.replies.lock().pop_front();
        let Some(scripted) = scripted else {
            return Err(TransportError::Network(format!(
                "no scripted response for {}",
                path
            )));
        };

        if let Some(gate) = scripted.gate {
            let _ = gate.await;
        }
        match scripted.reply {
            Reply::Error(error) => Err(error),
            reply => Ok(reply),
        }
    }
}

#[async_trait]
impl MetadataTransport for ScriptedTransport {
    async fn get_json(&self, path: &str, params: &QueryParams) -> Result<Value, TransportError> {
        match self.take(path, params).await? {
            Reply::Json(body) => Ok(body),
            Reply::Bytes(body) => serde_json::from_slice(&body)
                .map_err(|e| TransportError::Decode(e.to_string())),
            Reply::Error(error) => Err(error),
        }
    }

    async fn get_bytes(
        &self,
        path: &str,
        params: &QueryParams,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        match self.take(path, params).await? {
            Reply::Bytes(body) => Ok(body),
            Reply::Json(body) => Ok(body.to_string().into_bytes()),
            Reply::Error(error) => Err(error),
        }
    }
}
