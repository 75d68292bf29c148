use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::data::{DatasetId, DatasetState, Record};

/// The one picked row
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub dataset: DatasetId,

    /// Index into the rows of the page it was picked from
    pub row_index: usize,

    /// Copy of the picked row
    pub record: Record,
}

/// Shared selection state for the table, detail card and player.
///
/// Holds at most one row. Any fetch completion of the owning dataset clears
/// it, as does switching datasets.
#[derive(Debug, Default)]
pub struct SelectionModel {
    selection: Arc<RwLock<Option<Selection>>>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick row `row_index` of the loaded page. Returns false (and leaves the
    /// current selection alone) if there is no such row.
    pub fn select(&self, dataset: DatasetId, state: &DatasetState, row_index: usize) -> bool {
        let Some(record) = state.rows.get(row_index) else {
            return false;
        };
        *self.selection.write() = Some(Selection {
            dataset,
            row_index,
            record: record.clone(),
        });
        true
    }

    /// Get the current selection
    pub fn selected(&self) -> Option<Selection> {
        self.selection.read().clone()
    }

    /// Current selection if it belongs to `dataset`
    pub fn selected_in(&self, dataset: DatasetId) -> Option<Selection> {
        self.selection
            .read()
            .as_ref()
            .filter(|s| s.dataset == dataset)
            .cloned()
    }

    /// Drop the selection; returns whether there was one
    pub fn clear(&self) -> bool {
        self.selection.write().take().is_some()
    }

    /// Drop the selection if it belongs to `dataset`
    pub fn clear_for(&self, dataset: DatasetId) -> bool {
        let mut selection = self.selection.write();
        if selection.as_ref().map(|s| s.dataset) == Some(dataset) {
            debug!("Cleared {} selection", dataset);
            *selection = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> DatasetState {
        let mut state = DatasetState::default();
        state.replace_rows(vec![
            json!({"objectID": "a"}).as_object().cloned().unwrap(),
            json!({"objectID": "b"}).as_object().cloned().unwrap(),
        ]);
        state
    }

    #[test]
    fn test_select_and_clear() {
        let model = SelectionModel::new();
        assert!(model.select(DatasetId::Vpi, &page(), 1));

        let selected = model.selected().unwrap();
        assert_eq!(selected.row_index, 1);
        assert_eq!(selected.record["objectID"], "b");

        assert!(model.clear());
        assert!(model.selected().is_none());
    }

    #[test]
    fn test_out_of_range_pick_is_ignored() {
        let model = SelectionModel::new();
        model.select(DatasetId::Vpi, &page(), 0);
        assert!(!model.select(DatasetId::Vpi, &page(), 5));
        assert_eq!(model.selected().unwrap().row_index, 0);
    }

    #[test]
    fn test_clear_for_other_dataset_keeps_selection() {
        let model = SelectionModel::new();
        model.select(DatasetId::Vpi, &page(), 0);

        assert!(!model.clear_for(DatasetId::Talkdesk));
        assert!(model.selected_in(DatasetId::Vpi).is_some());
        assert!(model.selected_in(DatasetId::Talkdesk).is_none());

        assert!(model.clear_for(DatasetId::Vpi));
        assert!(model.selected().is_none());
    }
}
