//! Audio lookup for a selected record

use std::sync::Arc;
use std::time::Duration;

use cv_core::{DatasetId, Record};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BrowserConfig;
use crate::transport::{MetadataTransport, QueryParams};
use crate::DataError;

/// A resolved recording download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRequest {
    pub path: String,
    pub params: QueryParams,
    /// Name the audio is served under
    pub file_name: String,
}

/// Builds and runs recording requests for either dataset
pub struct RecordingLocator {
    transport: Arc<dyn MetadataTransport>,
    talkdesk_path: String,
    vpi_path: String,
    default_opco: String,
    timeout: Duration,
}

fn field(record: &Record, name: &str) -> Result<String, DataError> {
    let value = match record.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if value.is_empty() {
        return Err(DataError::MissingField(name.to_string()));
    }
    Ok(value)
}

impl RecordingLocator {
    pub fn new(transport: Arc<dyn MetadataTransport>, config: &BrowserConfig) -> Result<Self, DataError> {
        Ok(Self {
            transport,
            talkdesk_path: config.talkdesk.recording_path.clone(),
            vpi_path: config.vpi.recording_path.clone(),
            default_opco: config.vpi.opco.to_string(),
            timeout: config.recording_timeout()?,
        })
    }

    /// Request for `record` of `dataset`. `opco` overrides the configured
    /// operating company for session-dataset recordings.
    pub fn locate(
        &self,
        dataset: DatasetId,
        record: &Record,
        opco: Option<&str>,
    ) -> Result<RecordingRequest, DataError> {
        match dataset {
            DatasetId::Talkdesk => {
                let id = field(record, "Interaction_ID")?;
                Ok(RecordingRequest {
                    path: self.talkdesk_path.clone(),
                    params: vec![("interactionId".to_string(), id.clone())],
                    file_name: format!("{}.mp3", id),
                })
            }
            DatasetId::Vpi => {
                let file_name = field(record, "FileName")?;
                let date = field(record, "startTime")?;
                let opco = opco.unwrap_or(&self.default_opco).to_string();
                Ok(RecordingRequest {
                    path: self.vpi_path.clone(),
                    file_name: file_name.replace(".wav", ".mp3"),
                    params: vec![
                        ("filename".to_string(), file_name),
                        ("date".to_string(), date),
                        ("opco".to_string(), opco),
                    ],
                })
            }
        }
    }

    /// Download the audio bytes
    pub async fn fetch(&self, request: &RecordingRequest) -> Result<Vec<u8>, DataError> {
        debug!("Fetching recording {}", request.file_name);
        let bytes = self
            .transport
            .get_bytes(&request.path, &request.params, self.timeout)
            .await?;

        // The service answers a missing file with a JSON error body
        if bytes.first() == Some(&b'{') {
            if let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(&bytes) {
                if let Some(error) = body.get("error") {
                    let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
                    warn!("Recording {} unavailable: {}", request.file_name, message);
                    return Err(DataError::RecordingUnavailable(message));
                }
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedTransport, TransportError};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    fn locator() -> (Arc<ScriptedTransport>, RecordingLocator) {
        let transport = Arc::new(ScriptedTransport::new());
        let locator = RecordingLocator::new(transport.clone(), &BrowserConfig::default()).unwrap();
        (transport, locator)
    }

    #[test]
    fn test_locate_talkdesk() {
        let (_, locator) = locator();
        let request = locator
            .locate(DatasetId::Talkdesk, &record(json!({"Interaction_ID": "abc-1"})), None)
            .unwrap();
        assert_eq!(request.path, "/talkdesk/recording");
        assert_eq!(request.params, vec![("interactionId".to_string(), "abc-1".to_string())]);
        assert_eq!(request.file_name, "abc-1.mp3");
    }

    #[test]
    fn test_locate_vpi() {
        let (_, locator) = locator();
        let row = record(json!({"FileName": "call.wav", "startTime": "5/10/2018 4:01:28 PM"}));

        let request = locator.locate(DatasetId::Vpi, &row, None).unwrap();
        assert_eq!(request.path, "/vpi/recording");
        assert_eq!(request.file_name, "call.mp3");
        assert_eq!(request.params[1].1, "5/10/2018 4:01:28 PM");
        assert_eq!(request.params[2].1, "RGE");

        let request = locator.locate(DatasetId::Vpi, &row, Some("CMP")).unwrap();
        assert_eq!(request.params[2].1, "CMP");
    }

    #[test]
    fn test_missing_field() {
        let (_, locator) = locator();
        let result = locator.locate(DatasetId::Vpi, &record(json!({"FileName": "x.wav"})), None);
        assert!(matches!(result, Err(DataError::MissingField(f)) if f == "startTime"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_and_error_body() {
        let (transport, locator) = locator();
        transport.push_bytes(vec![0xFF, 0xFB, 0x90]);
        transport.push_json(json!({"error": "Audio file not found"}));
        transport.push_error(TransportError::Timeout);

        let request = locator
            .locate(DatasetId::Talkdesk, &record(json!({"Interaction_ID": 7})), None)
            .unwrap();
        assert_eq!(locator.fetch(&request).await.unwrap(), vec![0xFF, 0xFB, 0x90]);
        assert!(matches!(
            locator.fetch(&request).await,
            Err(DataError::RecordingUnavailable(m)) if m == "Audio file not found"
        ));
        assert!(matches!(
            locator.fetch(&request).await,
            Err(DataError::Transport(TransportError::Timeout))
        ));
        assert_eq!(transport.last_request().unwrap().param("interactionId"), Some("7"));
    }
}
