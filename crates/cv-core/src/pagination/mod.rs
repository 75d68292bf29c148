//! Page actions and the per-dataset coordinator that executes them

mod coordinator;

pub use coordinator::PaginationCoordinator;

use thiserror::Error;

use crate::data::{DatasetId, DatasetState};

/// Something a pager, badge or keyboard shortcut can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageAction {
    Next,
    Previous,
    /// Jump to a 1-based page
    Goto(u32),
    /// Back to page 1 of the unfiltered result
    Reset,
    /// Re-run the search restricted to the staged filters
    ApplyFilters,
    ClearFilters,
}

impl PageAction {
    /// Exclusive actions are refused while any request is in flight.
    /// Applying filters is an input change and supersedes instead.
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, PageAction::ApplyFilters)
    }
}

/// Why an action was refused. Refusals never touch dataset state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("a page request is already in flight")]
    Busy,

    #[error("page {page} is outside 1..={total_pages}")]
    OutOfRange { page: u32, total_pages: u32 },

    #[error("there is no next page")]
    NoNextPage,

    #[error("there is no previous page")]
    NoPreviousPage,

    #[error("{0:?} is not supported by this dataset")]
    Unsupported(PageAction),

    #[error("no date range has been searched yet")]
    NoQuery,

    #[error("{0} is not mounted")]
    NotMounted(DatasetId),
}

/// Coarse state of a dataset as seen by the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationPhase {
    /// Nothing was ever requested
    Idle,
    Loading,
    /// A page (possibly empty) is shown
    Loaded,
    Error,
}

impl PaginationPhase {
    pub fn of(state: &DatasetState) -> Self {
        if state.initial {
            PaginationPhase::Idle
        } else if state.loading {
            PaginationPhase::Loading
        } else if state.error.is_some() {
            PaginationPhase::Error
        } else {
            PaginationPhase::Loaded
        }
    }
}
