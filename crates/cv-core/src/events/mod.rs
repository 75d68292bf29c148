//! Typed notifications about fetches, selection and dataset switches

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

/// Something published on the [`EventBus`]
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Receiver of published events. Any `Fn(&dyn Event)` closure is one.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &dyn Event);
}

impl<F> EventHandler for F
where
    F: Fn(&dyn Event) + Send + Sync,
{
    fn handle(&self, event: &dyn Event) {
        self(event)
    }
}

/// Token for removing a handler again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handlers = Vec<(SubscriptionId, Arc<dyn EventHandler>)>;

/// Browser-wide event bus, routing each event to the handlers registered
/// for its concrete type
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<AHashMap<TypeId, Handlers>>,
    next_id: AtomicU64,
}

/// Controller events
pub mod events {
    use super::Event;
    use crate::data::DatasetId;

    /// A page was applied to a dataset
    #[derive(Debug, Clone, PartialEq)]
    pub struct PageLoaded {
        pub dataset: DatasetId,
        pub page: u32,
        pub row_count: usize,
        pub has_filters: bool,
    }

    /// A fetch ended with an error recorded in the dataset state
    #[derive(Debug, Clone, PartialEq)]
    pub struct FetchFailed {
        pub dataset: DatasetId,
        pub message: String,
    }

    /// The selected row changed; `row_index` is `None` when cleared
    #[derive(Debug, Clone, PartialEq)]
    pub struct SelectionChanged {
        pub dataset: DatasetId,
        pub row_index: Option<usize>,
    }

    /// The active dataset changed
    #[derive(Debug, Clone, PartialEq)]
    pub struct DatasetSwitched {
        pub from: DatasetId,
        pub to: DatasetId,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(PageLoaded, FetchFailed, SelectionChanged, DatasetSwitched);
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, Arc::from(handler)));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Deliver `event` to every handler of its type, in subscription order.
    /// Handlers run without the bus locked and may publish, subscribe or
    /// unsubscribe; such changes apply from the next publish on.
    pub fn publish<E: Event>(&self, event: E) {
        let handlers: Vec<Arc<dyn EventHandler>> = {
            let map = self.handlers.lock();
            match map.get(&TypeId::of::<E>()) {
                Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
                None => return,
            }
        };
        for handler in handlers {
            handler.handle(&event);
        }
    }
}

/// Handler that only sees events of type `E`
pub fn typed_handler<E, F>(f: F) -> Box<dyn EventHandler>
where
    E: Event,
    F: Fn(&E) + Send + Sync + 'static,
{
    Box::new(move |event: &dyn Event| {
        if let Some(event) = event.as_any().downcast_ref::<E>() {
            f(event);
        }
    })
}
