//! Remote dataset fetchers

mod catalog;
mod cursor_source;
mod session_source;
mod wire;

pub use catalog::DatasetDefinition;
pub use cursor_source::CursorFetcher;
pub use session_source::SessionFetcher;
pub use wire::{CursorPage, SessionPage};

use cv_core::{DateRange, FilterField, FilterSnapshot};

use crate::transport::QueryParams;

pub(crate) fn push(params: &mut QueryParams, key: &str, value: impl ToString) {
    params.push((key.to_string(), value.to_string()));
}

/// Filter parameters for the declared fields. The endpoints take one value
/// per field, so the first non-empty value is sent.
pub(crate) fn push_filters(
    params: &mut QueryParams,
    fields: &[FilterField],
    filters: &FilterSnapshot,
) {
    for field in fields {
        if let Some(value) = filters.first_value(&field.key) {
            push(params, &field.param, value);
        }
    }
}

pub(crate) fn push_range(params: &mut QueryParams, from_key: &str, to_key: &str, range: &DateRange) {
    push(params, from_key, range.from_wire());
    push(params, to_key, range.to_wire());
}
