use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::info;

use crate::data::{DatasetFetcher, DatasetId};
use crate::events::events::{DatasetSwitched, SelectionChanged};
use crate::events::EventBus;
use crate::pagination::PaginationCoordinator;
use crate::registry::CapabilityRegistry;
use crate::selection::{Selection, SelectionModel};

/// State of one browsing view: a coordinator per mounted dataset, the
/// shared registry and selection, and which dataset is in front.
pub struct BrowserState {
    /// Capability slots read by pagers and badges
    pub registry: Arc<CapabilityRegistry>,

    /// The one selected row across both datasets
    pub selection: Arc<SelectionModel>,

    /// The event bus
    pub event_bus: Arc<EventBus>,

    coordinators: RwLock<AHashMap<DatasetId, Arc<PaginationCoordinator>>>,

    active: RwLock<DatasetId>,
}

impl BrowserState {
    pub fn new(active: DatasetId) -> Self {
        Self {
            registry: Arc::new(CapabilityRegistry::new()),
            selection: Arc::new(SelectionModel::new()),
            event_bus: Arc::new(EventBus::new()),
            coordinators: RwLock::new(AHashMap::new()),
            active: RwLock::new(active),
        }
    }

    /// Mount a fetcher: build its coordinator and registry slot. Must be
    /// called inside a tokio runtime. Replaces any coordinator already
    /// mounted for the same dataset.
    pub fn mount(&self, fetcher: Arc<dyn DatasetFetcher>) -> Arc<PaginationCoordinator> {
        let coordinator = Arc::new(PaginationCoordinator::new(
            fetcher,
            Arc::clone(&self.selection),
            Arc::clone(&self.event_bus),
        ));
        coordinator.mount(&self.registry);

        let previous = self
            .coordinators
            .write()
            .insert(coordinator.dataset(), Arc::clone(&coordinator));
        if let Some(previous) = previous {
            previous.unmount();
        }
        coordinator
    }

    /// Tear down a dataset's coordinator; its slot reads as empty afterwards
    pub fn unmount(&self, dataset: DatasetId) {
        let removed = self.coordinators.write().remove(&dataset);
        if let Some(coordinator) = removed {
            coordinator.unmount();
            self.selection.clear_for(dataset);
        }
    }

    /// Unmount everything
    pub fn unmount_all(&self) {
        for dataset in DatasetId::ALL {
            self.unmount(dataset);
        }
    }

    pub fn coordinator(&self, dataset: DatasetId) -> Option<Arc<PaginationCoordinator>> {
        self.coordinators.read().get(&dataset).cloned()
    }

    pub fn active(&self) -> DatasetId {
        *self.active.read()
    }

    pub fn active_coordinator(&self) -> Option<Arc<PaginationCoordinator>> {
        self.coordinator(self.active())
    }

    /// Bring another dataset to the front. The selection never survives a
    /// switch.
    pub fn switch_to(&self, dataset: DatasetId) {
        let from = {
            let mut active = self.active.write();
            std::mem::replace(&mut *active, dataset)
        };
        if from == dataset {
            return;
        }

        if let Some(selection) = self.selection.selected() {
            self.selection.clear();
            self.event_bus.publish(SelectionChanged {
                dataset: selection.dataset,
                row_index: None,
            });
        }
        info!("Switched from {} to {}", from, dataset);
        self.event_bus.publish(DatasetSwitched { from, to: dataset });
    }

    /// Pick a row of the active dataset's loaded page
    pub fn select(&self, row_index: usize) -> bool {
        self.active_coordinator()
            .map(|coordinator| coordinator.select(row_index))
            .unwrap_or(false)
    }

    /// Selection of the active dataset
    pub fn selected(&self) -> Option<Selection> {
        self.selection.selected_in(self.active())
    }
}

impl Drop for BrowserState {
    fn drop(&mut self) {
        self.unmount_all();
    }
}
