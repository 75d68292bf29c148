//! Pagination coordinator implementation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ActionRejected, PageAction, PaginationPhase};
use crate::data::{
    Capabilities, DatasetFetcher, DatasetId, DatasetState, FetchOutcome, PageQuery,
};
use crate::events::events::{FetchFailed, PageLoaded, SelectionChanged};
use crate::events::EventBus;
use crate::input::{DateRange, FilterSnapshot};
use crate::registry::{CapabilityRegistry, PagerSnapshot, SlotHandle};
use crate::selection::SelectionModel;

/// Search inputs staged by the date input, filter set and scope selector
#[derive(Debug, Clone, Default)]
struct Inputs {
    range: Option<DateRange>,
    filters: FilterSnapshot,
    scope: Option<String>,
}

impl Inputs {
    fn query(&self) -> Option<PageQuery> {
        let range = self.range?;
        Some(PageQuery {
            range,
            filters: self.filters.clone(),
            scope: self.scope.clone(),
        })
    }
}

/// Count of requests issued by a coordinator that have not completed
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, exclusive: bool) -> Result<Self, ActionRejected> {
        if exclusive {
            counter
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .map_err(|_| ActionRejected::Busy)?;
        } else {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Self(counter))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State machine driving one dataset fetcher.
///
/// Exclusive actions (next, previous, goto, reset, clear filters) are
/// refused while a request is in flight. Input changes (a new date range,
/// scope, or applied filters) are always accepted; the fetcher's request
/// generation makes the newest one win.
pub struct PaginationCoordinator {
    fetcher: Arc<dyn DatasetFetcher>,
    selection: Arc<SelectionModel>,
    events: Arc<EventBus>,
    inputs: RwLock<Inputs>,
    slot: Mutex<Option<Arc<SlotHandle>>>,
    in_flight: AtomicUsize,
}

impl PaginationCoordinator {
    pub fn new(
        fetcher: Arc<dyn DatasetFetcher>,
        selection: Arc<SelectionModel>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            fetcher,
            selection,
            events,
            inputs: RwLock::new(Inputs::default()),
            slot: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn dataset(&self) -> DatasetId {
        self.fetcher.dataset()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.fetcher.capabilities()
    }

    pub fn page_size(&self) -> u32 {
        self.fetcher.page_size()
    }

    /// Snapshot of the fetcher's dataset state
    pub fn state(&self) -> DatasetState {
        self.fetcher.state()
    }

    pub fn phase(&self) -> PaginationPhase {
        PaginationPhase::of(&self.fetcher.state())
    }

    /// Pager view of the current state
    pub fn snapshot(&self) -> PagerSnapshot {
        PagerSnapshot::from_state(&self.fetcher.state(), self.capabilities(), self.page_size())
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.inputs.read().range
    }

    /// Filters staged for the next apply
    pub fn staged_filters(&self) -> FilterSnapshot {
        self.inputs.read().filters.clone()
    }

    pub fn scope(&self) -> Option<String> {
        self.inputs.read().scope.clone()
    }

    /// Create this dataset's registry slot and start serving its triggers.
    /// The returned task ends after [`PaginationCoordinator::unmount`].
    pub fn mount(self: &Arc<Self>, registry: &Arc<CapabilityRegistry>) -> JoinHandle<()> {
        let (handle, actions) = registry.mount(self.dataset());
        handle.publish(self.snapshot());
        let previous = self.slot.lock().replace(Arc::new(handle));
        drop(previous);
        tokio::spawn(Arc::clone(self).run(actions))
    }

    /// Remove the registry slot. Pending triggers are dropped.
    pub fn unmount(&self) {
        // The handle notifies subscribers on drop, outside the slot lock
        let slot = self.slot.lock().take();
        drop(slot);
    }

    async fn run(self: Arc<Self>, mut actions: mpsc::UnboundedReceiver<PageAction>) {
        while let Some(action) = actions.recv().await {
            let coordinator = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(rejected) = coordinator.dispatch(action).await {
                    debug!(
                        "{} trigger {:?} rejected: {}",
                        coordinator.dataset(),
                        action,
                        rejected
                    );
                }
            });
        }
        debug!("{} trigger loop stopped", self.dataset());
    }

    // Subscribers run from here, so the slot lock is released first
    fn publish(&self, snapshot: PagerSnapshot) {
        let slot = self.slot.lock().clone();
        if let Some(slot) = slot {
            slot.publish(snapshot);
        }
    }

    fn check(&self, action: PageAction) -> Result<(), ActionRejected> {
        let state = self.fetcher.state();
        let capabilities = self.capabilities();
        match action {
            PageAction::Next if !state.has_next => Err(ActionRejected::NoNextPage),
            PageAction::Previous if !capabilities.supports_previous => {
                Err(ActionRejected::Unsupported(action))
            }
            PageAction::Previous if !state.has_previous => Err(ActionRejected::NoPreviousPage),
            PageAction::Goto(_) if !capabilities.supports_jump => {
                Err(ActionRejected::Unsupported(action))
            }
            PageAction::Goto(page) if page < 1 || page > state.total_pages => {
                Err(ActionRejected::OutOfRange {
                    page,
                    total_pages: state.total_pages,
                })
            }
            _ => Ok(()),
        }
    }

    /// Perform a page action against the fetcher
    pub async fn dispatch(&self, action: PageAction) -> Result<FetchOutcome, ActionRejected> {
        let _guard = InFlight::enter(&self.in_flight, action.is_exclusive())?;
        let mut query = self.inputs.read().query().ok_or(ActionRejected::NoQuery)?;
        self.check(action)?;

        if matches!(action, PageAction::Reset | PageAction::ClearFilters) {
            self.inputs.write().filters = FilterSnapshot::default();
            query = query.without_filters();
        }

        info!("{} {:?}", self.dataset(), action);
        self.begin();
        let fetcher = &self.fetcher;
        let outcome = match action {
            PageAction::Next => fetcher.next(&query).await,
            PageAction::Previous => fetcher.previous(&query).await,
            PageAction::Goto(page) => fetcher.goto(page, &query).await,
            PageAction::Reset => fetcher.reset(&query).await,
            PageAction::ApplyFilters if query.filters.is_empty() => {
                fetcher.clear_filters(&query).await
            }
            PageAction::ApplyFilters => fetcher.apply_filters(&query).await,
            PageAction::ClearFilters => fetcher.clear_filters(&query).await,
        };
        self.complete(outcome);
        Ok(outcome)
    }

    /// Search a new date range from page 1 with the staged filters
    pub async fn search(&self, range: DateRange) -> Result<FetchOutcome, ActionRejected> {
        self.inputs.write().range = Some(range);
        self.refresh().await
    }

    /// Stage filters for the next [`PageAction::ApplyFilters`]
    pub fn set_filters(&self, filters: FilterSnapshot) {
        self.inputs.write().filters = filters;
    }

    /// Stage `filters` and apply them
    pub async fn apply_filters(
        &self,
        filters: FilterSnapshot,
    ) -> Result<FetchOutcome, ActionRejected> {
        self.set_filters(filters);
        self.dispatch(PageAction::ApplyFilters).await
    }

    /// Change the provider partition. A change re-runs the current search.
    pub async fn set_scope(&self, scope: Option<String>) -> Result<FetchOutcome, ActionRejected> {
        {
            let mut inputs = self.inputs.write();
            if inputs.scope == scope {
                return Ok(FetchOutcome::Skipped);
            }
            inputs.scope = scope;
            if inputs.range.is_none() {
                return Ok(FetchOutcome::Skipped);
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<FetchOutcome, ActionRejected> {
        let _guard = InFlight::enter(&self.in_flight, false)?;
        let query = self.inputs.read().query().ok_or(ActionRejected::NoQuery)?;

        info!("{} search {}", self.dataset(), query.range);
        self.begin();
        let outcome = self.fetcher.reset(&query).await;
        self.complete(outcome);
        Ok(outcome)
    }

    /// Pick a row of the loaded page
    pub fn select(&self, row_index: usize) -> bool {
        let dataset = self.dataset();
        let selected = self
            .selection
            .select(dataset, &self.fetcher.state(), row_index);
        if selected {
            self.events.publish(SelectionChanged {
                dataset,
                row_index: Some(row_index),
            });
        }
        selected
    }

    fn clear_selection(&self) {
        let dataset = self.dataset();
        if self.selection.clear_for(dataset) {
            self.events.publish(SelectionChanged {
                dataset,
                row_index: None,
            });
        }
    }

    fn begin(&self) {
        self.clear_selection();
        self.publish(self.snapshot().loading());
    }

    fn complete(&self, outcome: FetchOutcome) {
        let dataset = self.dataset();
        let state = self.fetcher.state();
        match outcome {
            FetchOutcome::Applied => {
                self.clear_selection();
                info!(
                    "{} page {} loaded ({} rows)",
                    dataset,
                    state.current_page,
                    state.rows.len()
                );
                self.events.publish(PageLoaded {
                    dataset,
                    page: state.current_page,
                    row_count: state.rows.len(),
                    has_filters: state.has_filters,
                });
            }
            FetchOutcome::Failed => {
                self.clear_selection();
                let message = state
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                warn!("{} fetch failed: {}", dataset, message);
                self.events.publish(FetchFailed { dataset, message });
            }
            FetchOutcome::Superseded => {
                debug!("{} discarded a superseded response", dataset);
            }
            FetchOutcome::Skipped => {}
        }
        self.publish(PagerSnapshot::from_state(
            &state,
            self.capabilities(),
            self.page_size(),
        ));
    }
}
