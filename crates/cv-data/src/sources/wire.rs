//! Response bodies of the metadata endpoints

use cv_core::Record;
use serde::Deserialize;

/// `{ data, continuation_token }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorPage {
    #[serde(default)]
    pub data: Vec<Record>,

    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl CursorPage {
    /// Token for the page after this one. An empty page ends the sequence
    /// whatever the server says.
    pub fn next_token(&self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        self.continuation_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .cloned()
    }
}

/// `{ data, session_id, total_pages, total_records }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub data: Vec<Record>,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub total_records: u64,
}
