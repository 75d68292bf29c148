//! Plain-text rendering of a loaded page

use cv_core::{
    DatasetState, DatasetView, FilterBadge, PageItem, PagerModel, PaginationCoordinator, Record,
};
use cv_data::DatasetDefinition;

fn cell(record: &Record, column: &str) -> String {
    match record.get(column) {
        None => String::new(),
        Some(value) => match value.as_str() {
            Some(text) => text.to_string(),
            None if value.is_null() => String::new(),
            None => value.to_string(),
        },
    }
}

/// Table body for the current view of `state`
pub fn table(state: &DatasetState, definition: &DatasetDefinition) -> String {
    match state.view() {
        DatasetView::Initial => "No search yet".to_string(),
        DatasetView::Loading => "Loading...".to_string(),
        DatasetView::Error(error) => format!("Error: {}", error.message),
        DatasetView::NoRecords => "No records found".to_string(),
        DatasetView::Rows(rows) => {
            let columns = definition.ordered_columns(&state.columns);
            let mut lines = vec![format!("#\t{}", columns.join("\t"))];
            for (index, row) in rows.iter().enumerate() {
                let cells: Vec<String> = columns.iter().map(|c| cell(row, c)).collect();
                lines.push(format!("{}\t{}", index, cells.join("\t")));
            }
            lines.join("\n")
        }
    }
}

/// One-line pager status
pub fn pager(coordinator: &PaginationCoordinator) -> String {
    match PagerModel::new(coordinator.capabilities().strategy, &coordinator.snapshot()) {
        PagerModel::Offset(pager) => {
            let pages: Vec<String> = pager
                .pages
                .iter()
                .map(|item| match item {
                    PageItem::Page(n) if *n == pager.current_page => format!("[{}]", n),
                    PageItem::Page(n) => n.to_string(),
                    PageItem::Ellipsis => "...".to_string(),
                })
                .collect();
            match pager.records {
                Some(records) => format!("{}  {}", pages.join(" "), records),
                None => pages.join(" "),
            }
        }
        PagerModel::Cursor(pager) => {
            let mut status = format!("{}  {}", pager.page_label(), pager.next_label());
            if pager.show_back_to_first {
                status.push_str("  (Back to First Page)");
            }
            status
        }
    }
}

/// Active range and filters, if any
pub fn badge(coordinator: &PaginationCoordinator, definition: &DatasetDefinition) -> Option<String> {
    let state = coordinator.state();
    let filters = state.active_filters.clone().unwrap_or_else(|| {
        if state.has_filters {
            coordinator.staged_filters()
        } else {
            Default::default()
        }
    });
    let range = coordinator.date_range();
    let badge = FilterBadge::new(range.as_ref(), &filters, &definition.fields);
    badge.is_visible().then(|| badge.to_string())
}
