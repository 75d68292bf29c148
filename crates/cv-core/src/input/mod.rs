//! Search inputs: the field filter set and the date-time range

mod datetime;
mod filter;

pub use datetime::{
    DateInputError, DateRange, DateTimeRangeInput, Endpoint, FieldErrors, Meridiem, TimeOfDay,
    WIRE_FORMAT,
};
pub use filter::{FilterError, FilterField, FilterSet, FilterSnapshot};
