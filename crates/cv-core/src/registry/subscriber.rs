//! Pager subscriber trait

use super::PagerSnapshot;
use crate::data::DatasetId;

/// Trait for sibling components (pager, filter badge) that need to respond
/// to pagination changes of a dataset
pub trait PagerSubscriber: Send + Sync {
    /// Called after every published snapshot of `dataset`
    fn on_pager_change(&self, dataset: DatasetId, snapshot: &PagerSnapshot);
}
