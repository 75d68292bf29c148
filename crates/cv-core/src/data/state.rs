use serde::Serialize;

use super::Record;
use crate::input::FilterSnapshot;

/// Message shown for any failure that is not a client error
pub const GENERIC_FETCH_ERROR: &str = "Something went wrong fetching data.";

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Input was rejected before any request was made
    Validation,
    /// The server answered with a 4xx status; the message is its own
    Rejected { status: u16 },
    /// Any other failure (5xx, network, undecodable body)
    Failed,
}

/// Error recorded in a dataset state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Rejected { status },
            message: message.into(),
        }
    }

    pub fn generic() -> Self {
        Self {
            kind: ErrorKind::Failed,
            message: GENERIC_FETCH_ERROR.to_string(),
        }
    }
}

/// Everything a fetcher knows about its dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetState {
    /// Rows of the loaded page
    pub rows: Vec<Record>,

    /// Field names of the first row, in server order
    pub columns: Vec<String>,

    /// Continuation token for the next page (cursor datasets)
    pub cursor: Option<String>,

    /// Session scoping the current result snapshot (session datasets)
    pub session_token: Option<String>,

    /// 1-based page number of `rows`
    pub current_page: u32,

    pub total_pages: u32,

    pub total_records: u64,

    pub has_next: bool,

    pub has_previous: bool,

    /// Whether the loaded page is a filtered view
    pub has_filters: bool,

    /// Filters the current session was narrowed by
    pub active_filters: Option<FilterSnapshot>,

    /// A request is in flight
    pub loading: bool,

    /// Error of the last completed request
    pub error: Option<ErrorInfo>,

    /// No request has ever been issued
    pub initial: bool,
}

impl Default for DatasetState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            cursor: None,
            session_token: None,
            current_page: 1,
            total_pages: 0,
            total_records: 0,
            has_next: false,
            has_previous: false,
            has_filters: false,
            active_filters: None,
            loading: false,
            error: None,
            initial: true,
        }
    }
}

/// What a table showing this dataset should render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatasetView<'a> {
    /// Nothing searched yet
    Initial,
    Loading,
    Error(&'a ErrorInfo),
    /// A search completed with zero rows
    NoRecords,
    Rows(&'a [Record]),
}

impl DatasetState {
    /// Mark a request as dispatched
    pub fn begin_request(&mut self) {
        self.loading = true;
        self.error = None;
        self.initial = false;
    }

    /// Replace the loaded page, recomputing columns from the first row
    pub fn replace_rows(&mut self, rows: Vec<Record>) {
        self.columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        self.rows = rows;
        self.loading = false;
        self.error = None;
    }

    /// Record a failed request: rows are cleared and paging is disabled
    /// until the next successful fetch
    pub fn fail(&mut self, error: ErrorInfo) {
        self.rows.clear();
        self.columns.clear();
        self.total_pages = 0;
        self.total_records = 0;
        self.has_next = false;
        self.has_previous = false;
        self.loading = false;
        self.error = Some(error);
    }

    /// Derive the table view
    pub fn view(&self) -> DatasetView<'_> {
        if self.initial {
            DatasetView::Initial
        } else if self.loading {
            DatasetView::Loading
        } else if let Some(error) = &self.error {
            DatasetView::Error(error)
        } else if self.rows.is_empty() {
            DatasetView::NoRecords
        } else {
            DatasetView::Rows(&self.rows)
        }
    }
}
