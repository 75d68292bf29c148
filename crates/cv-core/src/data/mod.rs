//! Contracts between the controller and the remote dataset fetchers

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::input::{DateRange, FilterSnapshot};

mod generation;
mod state;

pub use generation::RequestGeneration;
pub use state::{DatasetState, DatasetView, ErrorInfo, ErrorKind};

/// One row as returned by the remote service. Field order is preserved.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The two independently paginated metadata sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetId {
    /// Continuation-token dataset
    Talkdesk,
    /// Session/offset dataset
    Vpi,
}

impl DatasetId {
    pub const ALL: [DatasetId; 2] = [DatasetId::Talkdesk, DatasetId::Vpi];

    /// Display name of the dataset
    pub fn name(&self) -> &'static str {
        match self {
            DatasetId::Talkdesk => "TALKDESK",
            DatasetId::Vpi => "VPI",
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a dataset moves between pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStrategy {
    /// Forward-only continuation tokens
    Cursor,
    /// Server-held snapshot addressed by page number
    SessionOffset,
}

/// What a fetcher can do beyond "start over" and "next"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub strategy: PaginationStrategy,
    pub supports_previous: bool,
    pub supports_jump: bool,
}

impl Capabilities {
    pub const CURSOR: Capabilities = Capabilities {
        strategy: PaginationStrategy::Cursor,
        supports_previous: false,
        supports_jump: false,
    };

    pub const SESSION_OFFSET: Capabilities = Capabilities {
        strategy: PaginationStrategy::SessionOffset,
        supports_previous: true,
        supports_jump: true,
    };
}

/// Inputs of a search: a validated date range, the filter snapshot, and an
/// optional provider partition (the VPI operating company).
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub range: DateRange,
    pub filters: FilterSnapshot,
    pub scope: Option<String>,
}

impl PageQuery {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            filters: FilterSnapshot::default(),
            scope: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterSnapshot) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Same query with every filter dropped
    pub fn without_filters(&self) -> Self {
        Self {
            range: self.range,
            filters: FilterSnapshot::default(),
            scope: self.scope.clone(),
        }
    }
}

/// Result of one fetch call. Failures are recorded in the fetcher's state,
/// never returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied to the dataset state
    Applied,
    /// The request failed and the state now carries the error
    Failed,
    /// A newer request was issued while this one was in flight; the
    /// response was dropped
    Superseded,
    /// The fetcher has no such operation, or nothing to fetch from yet
    Skipped,
}

/// A remote dataset that can be paged through.
///
/// Every method converts transport failures into state, so callers read the
/// result through [`DatasetFetcher::state`].
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Which dataset this fetcher serves
    fn dataset(&self) -> DatasetId;

    /// Pagination capabilities of the underlying protocol
    fn capabilities(&self) -> Capabilities;

    /// Rows per page requested from the remote service
    fn page_size(&self) -> u32;

    /// Snapshot of the current dataset state
    fn state(&self) -> DatasetState;

    /// Start over from the first page of `query`
    async fn reset(&self, query: &PageQuery) -> FetchOutcome;

    /// Fetch the page after the current one
    async fn next(&self, query: &PageQuery) -> FetchOutcome;

    /// Fetch the page before the current one
    async fn previous(&self, _query: &PageQuery) -> FetchOutcome {
        FetchOutcome::Skipped
    }

    /// Fetch an arbitrary page (1-based)
    async fn goto(&self, _page: u32, _query: &PageQuery) -> FetchOutcome {
        FetchOutcome::Skipped
    }

    /// Restrict results to `query.filters`, starting at page 1
    async fn apply_filters(&self, query: &PageQuery) -> FetchOutcome;

    /// Drop every filter and start over
    async fn clear_filters(&self, query: &PageQuery) -> FetchOutcome;
}
