//! Remote dataset sources for the call-recording browser

pub mod config;
pub mod recording;
pub mod sources;
pub mod transport;

use thiserror::Error;

// Re-exports
pub use config::{BrowserConfig, Opco, TalkdeskConfig, VpiConfig};
pub use recording::{RecordingLocator, RecordingRequest};
pub use sources::{CursorFetcher, DatasetDefinition, SessionFetcher};
pub use transport::{
    HttpTransport, MetadataTransport, QueryParams, RecordedRequest, ScriptedTransport,
    TransportError,
};

/// Errors that can occur outside a fetch (fetch failures live in dataset state)
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Record has no '{0}' field")]
    MissingField(String),

    #[error("Recording unavailable: {0}")]
    RecordingUnavailable(String),
}
