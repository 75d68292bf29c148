//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{MetadataTransport, QueryParams, TransportError};
use crate::DataError;

const USER_AGENT: &str = concat!("callvault/", env!("CARGO_PKG_VERSION"));

/// Error body of the metadata service: `{"detail": ...}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// HTTP transport rooted at the service base URL
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport. `timeout` bounds metadata requests; `None`
    /// leaves them to the client's own behavior.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, DataError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Network(e.to_string()))
    }

    async fn send(
        &self,
        path: &str,
        params: &QueryParams,
        timeout: Option<Duration>,
    ) -> Result<Response, TransportError> {
        let url = self.url(path)?;
        debug!("GET {} {:?}", url, params);

        let mut request = self.client.get(url).query(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .map(|detail| match detail {
                Value::String(message) => message,
                other => other.to_string(),
            });
        Err(TransportError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl MetadataTransport for HttpTransport {
    async fn get_json(&self, path: &str, params: &QueryParams) -> Result<Value, TransportError> {
        let response = self.send(path, params, None).await?;
        response.json::<Value>().await.map_err(classify)
    }

    async fn get_bytes(
        &self,
        path: &str,
        params: &QueryParams,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let response = self.send(path, params, Some(timeout)).await?;
        let bytes = response.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }
}
