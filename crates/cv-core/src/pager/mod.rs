//! View models for the pager bar and the filter badge. Both are pure
//! functions of registry snapshots and staged inputs.

use std::fmt;

use crate::data::PaginationStrategy;
use crate::input::{DateRange, FilterField, FilterSnapshot};
use crate::registry::PagerSnapshot;

/// Pages shown on either side of the current one
const WINDOW_DELTA: u32 = 1;

/// One button of the page-number strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page-number strip around `current`, with the first and last page pinned
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    let span = 2 * WINDOW_DELTA + 1;
    if total_pages <= span {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let current = current.clamp(1, total_pages);
    let (start, end) = if current <= WINDOW_DELTA + 1 {
        (1, span)
    } else if current + WINDOW_DELTA >= total_pages {
        (total_pages - span + 1, total_pages)
    } else {
        (current - WINDOW_DELTA, current + WINDOW_DELTA)
    };

    let mut items = Vec::with_capacity(span as usize + 4);
    if start > 1 {
        items.push(PageItem::Page(1));
        if start > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total_pages {
        if end + 1 < total_pages {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(total_pages));
    }
    items
}

/// 1-based span of records on the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRange {
    pub first: u64,
    pub last: u64,
    pub total: u64,
}

impl RecordRange {
    /// `None` when there are no records at all
    pub fn of(current_page: u32, page_size: u32, total_records: u64) -> Option<Self> {
        if total_records == 0 || current_page == 0 {
            return None;
        }
        let page_size = u64::from(page_size.max(1));
        let first = (u64::from(current_page) - 1) * page_size + 1;
        let last = (u64::from(current_page) * page_size).min(total_records);
        Some(Self {
            first: first.min(total_records),
            last,
            total: total_records,
        })
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing records {} - {} of {} records",
            self.first, self.last, self.total
        )
    }
}

/// Pager for datasets addressed by page number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPager {
    pub pages: Vec<PageItem>,
    pub current_page: u32,
    pub total_pages: u32,
    pub records: Option<RecordRange>,
    pub can_first: bool,
    pub can_previous: bool,
    pub can_next: bool,
    pub can_last: bool,
    /// Reset is offered on filtered results or away from page 1
    pub show_reset: bool,
}

/// Pager for forward-only datasets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPager {
    pub current_page: u32,
    pub can_next: bool,
    /// Walked off the end of a multi-page result
    pub end_of_results: bool,
    pub show_back_to_first: bool,
    pub is_loading: bool,
}

impl CursorPager {
    pub fn page_label(&self) -> String {
        format!("Page {}", self.current_page)
    }

    pub fn next_label(&self) -> &'static str {
        if self.is_loading {
            "Loading..."
        } else if self.can_next {
            "Next"
        } else {
            "End of Results"
        }
    }
}

/// Pager bar for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerModel {
    Offset(OffsetPager),
    Cursor(CursorPager),
}

impl PagerModel {
    pub fn new(strategy: PaginationStrategy, snapshot: &PagerSnapshot) -> Self {
        let idle = !snapshot.is_loading;
        match strategy {
            PaginationStrategy::SessionOffset => {
                let current = snapshot.current_page;
                let total = snapshot.total_pages;
                PagerModel::Offset(OffsetPager {
                    pages: page_window(current, total),
                    current_page: current,
                    total_pages: total,
                    records: RecordRange::of(current, snapshot.page_size, snapshot.total_records),
                    can_first: idle && current > 1,
                    can_previous: idle && snapshot.has_previous,
                    can_next: idle && snapshot.has_next,
                    can_last: idle && total > 0 && current < total,
                    show_reset: snapshot.has_filters || current > 1,
                })
            }
            PaginationStrategy::Cursor => {
                let current = snapshot.current_page;
                let past_first = current > 1 && !snapshot.has_next;
                PagerModel::Cursor(CursorPager {
                    current_page: current,
                    can_next: idle && snapshot.has_next,
                    end_of_results: past_first,
                    show_back_to_first: past_first,
                    is_loading: snapshot.is_loading,
                })
            }
        }
    }
}

/// Summary of what the current results are narrowed by
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterBadge {
    pub range: Option<String>,
    /// (label, values) per filter with at least one value
    pub filters: Vec<(String, String)>,
}

impl FilterBadge {
    pub fn new(range: Option<&DateRange>, filters: &FilterSnapshot, fields: &[FilterField]) -> Self {
        let filters = filters
            .iter()
            .map(|(key, values)| {
                let label = fields
                    .iter()
                    .find(|f| f.key == key)
                    .map(|f| f.label.clone())
                    .unwrap_or_else(|| key.to_string());
                (label, values.join(", "))
            })
            .collect();
        Self {
            range: range.map(|r| format!("{} to {}", r.from_wire(), r.to_wire())),
            filters,
        }
    }

    /// Hidden when there is neither a range nor any filter value
    pub fn is_visible(&self) -> bool {
        self.range.is_some() || !self.filters.is_empty()
    }
}

impl fmt::Display for FilterBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(range) = &self.range {
            parts.push(format!("Date: {}", range));
        }
        for (label, values) in &self.filters {
            parts.push(format!("{}: {}", label, values));
        }
        f.write_str(&parts.join(" | "))
    }
}
