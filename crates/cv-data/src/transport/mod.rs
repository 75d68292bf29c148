//! Access to the metadata and recording endpoints

mod http;
mod scripted;

pub use http::HttpTransport;
pub use scripted::{RecordedRequest, ScriptedTransport};

use std::time::Duration;

use async_trait::async_trait;
use cv_core::ErrorInfo;
use serde_json::Value;
use thiserror::Error;

/// Query string parameters in the order they are sent
pub type QueryParams = Vec<(String, String)>;

/// Failure of a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("server returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Error to record in dataset state. Client errors carry the server's
    /// own message; everything else gets the generic one.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            TransportError::Status {
                status,
                detail: Some(detail),
            } if (400..500).contains(status) => ErrorInfo::rejected(*status, detail.clone()),
            _ => ErrorInfo::generic(),
        }
    }
}

/// GET access to the remote service
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// GET `path` and return the JSON body
    async fn get_json(&self, path: &str, params: &QueryParams) -> Result<Value, TransportError>;

    /// GET `path` and return the raw body, bounded by `timeout`
    async fn get_bytes(
        &self,
        path: &str,
        params: &QueryParams,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Decode a JSON body into a wire type
pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}
