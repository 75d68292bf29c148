//! Browser configuration: service location, endpoint paths, page sizes and
//! timeouts. Every field has a default; a TOML file overrides any subset.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DataError;

/// Environment variable overriding [`BrowserConfig::api_base_url`]
pub const API_BASE_URL_ENV: &str = "CALLVAULT_API_BASE_URL";

/// Operating company partitioning the VPI recordings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opco {
    Cmp,
    #[default]
    Rge,
    Nyseg,
}

impl Opco {
    pub const ALL: [Opco; 3] = [Opco::Cmp, Opco::Rge, Opco::Nyseg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Opco::Cmp => "CMP",
            Opco::Rge => "RGE",
            Opco::Nyseg => "NYSEG",
        }
    }
}

impl fmt::Display for Opco {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opco {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opco::ALL
            .into_iter()
            .find(|opco| opco.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DataError::Config(format!(
                    "Invalid opco '{}'. Must be 'CMP', 'RGE', or 'NYSEG'",
                    s
                ))
            })
    }
}

/// Continuation-token dataset endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkdeskConfig {
    pub metadata_path: String,
    pub recording_path: String,
    pub page_size: u32,
}

impl Default for TalkdeskConfig {
    fn default() -> Self {
        Self {
            metadata_path: "/talkdesk/metadata".to_string(),
            recording_path: "/talkdesk/recording".to_string(),
            page_size: 10,
        }
    }
}

/// Session dataset endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpiConfig {
    pub metadata_path: String,
    pub filter_path: String,
    pub recording_path: String,
    pub page_size: u32,
    pub opco: Opco,
}

impl Default for VpiConfig {
    fn default() -> Self {
        Self {
            metadata_path: "/vpi/metadata".to_string(),
            filter_path: "/cmp/filter".to_string(),
            recording_path: "/vpi/recording".to_string(),
            page_size: 6,
            opco: Opco::default(),
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Root of the metadata service
    pub api_base_url: String,

    /// Upper bound for metadata requests, e.g. "30s". Unset means the
    /// transport's own behavior.
    pub metadata_timeout: Option<String>,

    /// Upper bound for recording downloads
    pub recording_timeout: String,

    /// Interval for pollers of the capability registry
    pub poll_interval: String,

    pub talkdesk: TalkdeskConfig,

    pub vpi: VpiConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            metadata_timeout: None,
            recording_timeout: "15s".to_string(),
            poll_interval: "250ms".to_string(),
            talkdesk: TalkdeskConfig::default(),
            vpi: VpiConfig::default(),
        }
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, DataError> {
    humantime::parse_duration(value)
        .map_err(|e| DataError::Config(format!("{}: invalid duration '{}': {}", field, value, e)))
}

impl BrowserConfig {
    /// Load a TOML file, apply the environment override and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse TOML text, apply the environment override and validate
    pub fn from_toml(text: &str) -> Result<Self, DataError> {
        let mut config: Self = toml::from_str(text)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the environment override
    pub fn from_env() -> Result<Self, DataError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    /// Check every field that can be malformed
    pub fn validate(&self) -> Result<(), DataError> {
        url::Url::parse(&self.api_base_url)?;
        self.metadata_timeout()?;
        self.recording_timeout()?;
        self.poll_interval()?;
        if self.talkdesk.page_size == 0 || self.vpi.page_size == 0 {
            return Err(DataError::Config("page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn metadata_timeout(&self) -> Result<Option<Duration>, DataError> {
        self.metadata_timeout
            .as_deref()
            .map(|value| parse_duration("metadata_timeout", value))
            .transpose()
    }

    pub fn recording_timeout(&self) -> Result<Duration, DataError> {
        parse_duration("recording_timeout", &self.recording_timeout)
    }

    pub fn poll_interval(&self) -> Result<Duration, DataError> {
        parse_duration("poll_interval", &self.poll_interval)
    }
}
