//! Per-dataset capability slots shared between the pagination coordinator
//! and the components that observe or drive it without owning it.
//!
//! A slot exists while its dataset is mounted. Readers never need a slot:
//! an unmounted dataset reads as [`PagerSnapshot::default`] (no data, not
//! loading, no pages).

mod subscriber;

pub use subscriber::PagerSubscriber;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::data::{Capabilities, DatasetId, DatasetState};
use crate::pagination::{ActionRejected, PageAction};

/// Read-only view of one dataset's pagination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PagerSnapshot {
    pub mounted: bool,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub page_size: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub is_loading: bool,
    pub has_filters: bool,
    pub supports_jump: bool,
}

impl PagerSnapshot {
    /// Project a dataset state through its fetcher's capabilities
    pub fn from_state(state: &DatasetState, capabilities: Capabilities, page_size: u32) -> Self {
        Self {
            mounted: true,
            current_page: state.current_page,
            total_pages: state.total_pages,
            total_records: state.total_records,
            page_size,
            has_next: state.has_next,
            has_previous: capabilities.supports_previous && state.has_previous,
            is_loading: state.loading,
            has_filters: state.has_filters,
            supports_jump: capabilities.supports_jump,
        }
    }

    /// The same view with a request in flight
    pub fn loading(mut self) -> Self {
        self.is_loading = true;
        self
    }

    /// Check an action against this view before sending it.
    ///
    /// Only coordinator state can make the final call, but this rejects the
    /// obvious cases without a round trip.
    pub fn check(&self, action: PageAction) -> Result<(), ActionRejected> {
        if self.is_loading && action.is_exclusive() {
            return Err(ActionRejected::Busy);
        }
        match action {
            PageAction::Next if !self.has_next => Err(ActionRejected::NoNextPage),
            PageAction::Previous if !self.has_previous => Err(ActionRejected::NoPreviousPage),
            PageAction::Goto(page) if !self.supports_jump => {
                Err(ActionRejected::Unsupported(PageAction::Goto(page)))
            }
            PageAction::Goto(page) if page < 1 || page > self.total_pages => {
                Err(ActionRejected::OutOfRange {
                    page,
                    total_pages: self.total_pages,
                })
            }
            _ => Ok(()),
        }
    }
}

struct Slot {
    id: u64,
    actions: mpsc::UnboundedSender<PageAction>,
}

/// Registry of mounted datasets
pub struct CapabilityRegistry {
    slots: RwLock<AHashMap<DatasetId, Slot>>,
    channels: AHashMap<DatasetId, watch::Sender<PagerSnapshot>>,
    subscribers: RwLock<AHashMap<DatasetId, Vec<Weak<dyn PagerSubscriber>>>>,
    next_id: AtomicU64,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let channels = DatasetId::ALL
            .into_iter()
            .map(|id| (id, watch::channel(PagerSnapshot::default()).0))
            .collect();
        Self {
            slots: RwLock::new(AHashMap::new()),
            channels,
            subscribers: RwLock::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create the slot of `dataset`, replacing any previous one. Actions
    /// triggered through the registry arrive on the returned receiver.
    pub fn mount(
        self: &Arc<Self>,
        dataset: DatasetId,
    ) -> (SlotHandle, mpsc::UnboundedReceiver<PageAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.slots.write().insert(dataset, Slot { id, actions: tx });
        info!("Mounted {} pager slot", dataset);

        let handle = SlotHandle {
            registry: Arc::clone(self),
            dataset,
            id,
        };
        (handle, rx)
    }

    fn unmount(&self, dataset: DatasetId, id: u64) {
        let mut slots = self.slots.write();
        // A remount may already own the slot
        if slots.get(&dataset).map(|slot| slot.id) != Some(id) {
            return;
        }
        slots.remove(&dataset);
        drop(slots);

        info!("Unmounted {} pager slot", dataset);
        self.publish(dataset, PagerSnapshot::default());
    }

    pub fn is_mounted(&self, dataset: DatasetId) -> bool {
        self.slots.read().contains_key(&dataset)
    }

    fn publish(&self, dataset: DatasetId, snapshot: PagerSnapshot) {
        if let Some(tx) = self.channels.get(&dataset) {
            tx.send_replace(snapshot.clone());
        }
        self.notify_subscribers(dataset, &snapshot);
    }

    /// Current snapshot; safe to call at any interval
    pub fn poll(&self, dataset: DatasetId) -> PagerSnapshot {
        self.channels
            .get(&dataset)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default()
    }

    /// Receive every published snapshot of `dataset`
    pub fn subscribe(&self, dataset: DatasetId) -> watch::Receiver<PagerSnapshot> {
        match self.channels.get(&dataset) {
            Some(tx) => tx.subscribe(),
            None => watch::channel(PagerSnapshot::default()).1,
        }
    }

    /// Add a callback subscriber. Only a weak reference is kept.
    pub fn add_subscriber(&self, dataset: DatasetId, subscriber: Arc<dyn PagerSubscriber>) {
        self.subscribers
            .write()
            .entry(dataset)
            .or_default()
            .push(Arc::downgrade(&subscriber));
    }

    fn notify_subscribers(&self, dataset: DatasetId, snapshot: &PagerSnapshot) {
        let live: Vec<Arc<dyn PagerSubscriber>> = {
            let mut subscribers = self.subscribers.write();
            let Some(list) = subscribers.get_mut(&dataset) else {
                return;
            };
            // Remove any dead weak references
            list.retain(|weak| weak.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            subscriber.on_pager_change(dataset, snapshot);
        }
    }

    pub fn current_page(&self, dataset: DatasetId) -> u32 {
        self.poll(dataset).current_page
    }

    pub fn total_pages(&self, dataset: DatasetId) -> u32 {
        self.poll(dataset).total_pages
    }

    pub fn total_records(&self, dataset: DatasetId) -> u64 {
        self.poll(dataset).total_records
    }

    pub fn has_next_page(&self, dataset: DatasetId) -> bool {
        self.poll(dataset).has_next
    }

    /// Always false for cursor datasets
    pub fn has_prev_page(&self, dataset: DatasetId) -> bool {
        self.poll(dataset).has_previous
    }

    pub fn is_loading(&self, dataset: DatasetId) -> bool {
        self.poll(dataset).is_loading
    }

    pub fn has_filters(&self, dataset: DatasetId) -> bool {
        self.poll(dataset).has_filters
    }

    /// Ask the mounted coordinator of `dataset` to perform `action`
    pub fn trigger(&self, dataset: DatasetId, action: PageAction) -> Result<(), ActionRejected> {
        let slots = self.slots.read();
        let slot = slots
            .get(&dataset)
            .ok_or(ActionRejected::NotMounted(dataset))?;

        if let Err(rejected) = self.poll(dataset).check(action) {
            debug!("Rejected {:?} on {}: {}", action, dataset, rejected);
            return Err(rejected);
        }

        slot.actions
            .send(action)
            .map_err(|_| ActionRejected::NotMounted(dataset))
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of a mounted slot. Dropping it unmounts the dataset.
pub struct SlotHandle {
    registry: Arc<CapabilityRegistry>,
    dataset: DatasetId,
    id: u64,
}

impl SlotHandle {
    pub fn dataset(&self) -> DatasetId {
        self.dataset
    }

    /// Publish a snapshot to pollers, watchers and subscribers
    pub fn publish(&self, snapshot: PagerSnapshot) {
        self.registry.publish(self.dataset, snapshot);
    }

    /// Last published snapshot
    pub fn current(&self) -> PagerSnapshot {
        self.registry.poll(self.dataset)
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        self.registry.unmount(self.dataset, self.id);
    }
}
