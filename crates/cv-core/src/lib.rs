//! Core functionality for the call-recording browser
//!
//! This crate provides the contracts between the controller and the remote
//! dataset fetchers, together with the pagination state machine, the
//! capability registry shared with sibling components, and the filter and
//! date-range inputs that drive a search.

pub mod data;
pub mod events;
pub mod input;
pub mod pager;
pub mod pagination;
pub mod registry;
pub mod selection;
pub mod state;

// Re-export commonly used types
pub use data::{
    Capabilities, DatasetFetcher, DatasetId, DatasetState, DatasetView, ErrorInfo, ErrorKind,
    FetchOutcome, PageQuery, PaginationStrategy, Record, RequestGeneration,
};
pub use events::{EventBus, SubscriptionId};
pub use input::{
    DateInputError, DateRange, DateTimeRangeInput, Endpoint, FieldErrors, FilterError,
    FilterField, FilterSet, FilterSnapshot, Meridiem, TimeOfDay,
};
pub use pager::{page_window, CursorPager, FilterBadge, OffsetPager, PageItem, PagerModel, RecordRange};
pub use pagination::{ActionRejected, PageAction, PaginationCoordinator, PaginationPhase};
pub use registry::{CapabilityRegistry, PagerSnapshot, PagerSubscriber, SlotHandle};
pub use selection::{Selection, SelectionModel};
pub use state::BrowserState;
