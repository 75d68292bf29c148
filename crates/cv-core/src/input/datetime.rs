//! Date-time range entry: free text or picker selections, normalized to one
//! 24-hour wire format and validated before any search is dispatched.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Canonical wire and display format
pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static TIME_24H_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d):([0-5]\d)$").unwrap());

static TIME_12H_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(0?[1-9]|1[0-2]):([0-5]\d)(?::([0-5]\d))?\s*(AM|PM)$").unwrap()
});

/// Which side of the range a value or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    From,
    To,
}

impl Endpoint {
    fn label(self) -> &'static str {
        match self {
            Endpoint::From => "Start",
            Endpoint::To => "End",
        }
    }
}

/// Field-scoped validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateInputError {
    #[error("{} date & time required", .0.label())]
    Required(Endpoint),

    #[error("Invalid format (YYYY-MM-DD HH:MM:SS)")]
    InvalidFormat(Endpoint),

    #[error("Invalid time {hour}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("End date must be after start date")]
    EndBeforeStart,
}

impl DateInputError {
    /// The field the error is reported on
    pub fn endpoint(&self) -> Endpoint {
        match self {
            DateInputError::Required(endpoint) | DateInputError::InvalidFormat(endpoint) => {
                *endpoint
            }
            DateInputError::InvalidTime { .. } | DateInputError::EndBeforeStart => Endpoint::To,
        }
    }
}

/// Validation state of both fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub from: Option<DateInputError>,
    pub to: Option<DateInputError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn get(&self, endpoint: Endpoint) -> Option<&DateInputError> {
        match endpoint {
            Endpoint::From => self.from.as_ref(),
            Endpoint::To => self.to.as_ref(),
        }
    }

    fn set(&mut self, endpoint: Endpoint, error: DateInputError) {
        match endpoint {
            Endpoint::From => self.from = Some(error),
            Endpoint::To => self.to = Some(error),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = [&self.from, &self.to]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect();
        f.write_str(&messages.join("; "))
    }
}

/// A validated range with `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl DateRange {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self, DateInputError> {
        if from > to {
            return Err(DateInputError::EndBeforeStart);
        }
        Ok(Self { from, to })
    }

    /// Parse two free-text endpoints. Date-only text takes the default
    /// picker times (start of day for `from`, noon for `to`).
    pub fn parse(from: &str, to: &str) -> Result<Self, FieldErrors> {
        let mut input = DateTimeRangeInput::new();
        input.set_text(Endpoint::From, from);
        input.set_text(Endpoint::To, to);
        input.validate()
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    /// `from` in wire format
    pub fn from_wire(&self) -> String {
        self.from.format(WIRE_FORMAT).to_string()
    }

    /// `to` in wire format
    pub fn to_wire(&self) -> String {
        self.to.format(WIRE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.from_wire(), self.to_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// A 12-hour clock time as picked from a time selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Meridiem,
}

impl TimeOfDay {
    pub const fn new(hour: u32, minute: u32, meridiem: Meridiem) -> Self {
        Self {
            hour,
            minute,
            meridiem,
        }
    }

    /// Convert to a 24-hour time; hour must be 1..=12
    pub fn to_naive(self) -> Result<NaiveTime, DateInputError> {
        let invalid = DateInputError::InvalidTime {
            hour: self.hour,
            minute: self.minute,
        };
        if !(1..=12).contains(&self.hour) {
            return Err(invalid);
        }
        let hour = match (self.hour, self.meridiem) {
            (12, Meridiem::Am) => 0,
            (12, Meridiem::Pm) => 12,
            (h, Meridiem::Am) => h,
            (h, Meridiem::Pm) => h + 12,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0).ok_or(invalid)
    }

    pub fn from_naive(time: NaiveTime) -> Self {
        let (pm, hour) = time.hour12();
        Self {
            hour,
            minute: time.minute(),
            meridiem: if pm { Meridiem::Pm } else { Meridiem::Am },
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.meridiem {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        };
        write!(f, "{:02}:{:02} {}", self.hour, self.minute, suffix)
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = TIME_24H_RE.captures(text) {
        let hour = caps[1].parse().ok()?;
        let minute = caps[2].parse().ok()?;
        let second = caps[3].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, second);
    }

    let caps = TIME_12H_RE.captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    let meridiem = if caps[4].eq_ignore_ascii_case("pm") {
        Meridiem::Pm
    } else {
        Meridiem::Am
    };
    let time = TimeOfDay::new(hour, minute, meridiem).to_naive().ok()?;
    time.with_second(second)
}

/// Parse "YYYY-MM-DD[ time]". A missing time part yields `None` for the time.
fn parse_text(text: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let text = text.trim();
    let (date_part, time_part) = match text.split_once(char::is_whitespace) {
        Some((date, time)) => (date, time.trim()),
        None => (text, ""),
    };
    if !DATE_RE.is_match(date_part) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    if time_part.is_empty() {
        return Some((date, None));
    }
    parse_time(time_part).map(|time| (date, Some(time)))
}

#[derive(Debug, Clone)]
struct EndpointInput {
    date: Option<NaiveDate>,
    time: NaiveTime,
    text: String,
}

impl EndpointInput {
    fn new(time: NaiveTime) -> Self {
        Self {
            date: None,
            time,
            text: String::new(),
        }
    }

    fn value(&self) -> Option<NaiveDateTime> {
        self.date.map(|date| date.and_time(self.time))
    }

    fn sync_text(&mut self) {
        if let Some(value) = self.value() {
            self.text = value.format(WIRE_FORMAT).to_string();
        }
    }
}

/// Editable from/to pair with its own display text and validation state.
///
/// Free text is held verbatim until committed; picker selections update the
/// display text immediately. Validation never rewrites what the user typed.
#[derive(Debug, Clone)]
pub struct DateTimeRangeInput {
    from: EndpointInput,
    to: EndpointInput,
    errors: FieldErrors,
}

impl Default for DateTimeRangeInput {
    fn default() -> Self {
        Self::new()
    }
}

impl DateTimeRangeInput {
    /// Picker time defaults: 12:00 AM for the start, 12:00 PM for the end
    pub fn new() -> Self {
        Self {
            from: EndpointInput::new(NaiveTime::MIN),
            to: EndpointInput::new(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)),
            errors: FieldErrors::default(),
        }
    }

    fn endpoint(&self, endpoint: Endpoint) -> &EndpointInput {
        match endpoint {
            Endpoint::From => &self.from,
            Endpoint::To => &self.to,
        }
    }

    fn endpoint_mut(&mut self, endpoint: Endpoint) -> &mut EndpointInput {
        match endpoint {
            Endpoint::From => &mut self.from,
            Endpoint::To => &mut self.to,
        }
    }

    /// Raw text shown in a field
    pub fn text(&self, endpoint: Endpoint) -> &str {
        &self.endpoint(endpoint).text
    }

    /// Time currently held for a field, for the picker
    pub fn time(&self, endpoint: Endpoint) -> TimeOfDay {
        TimeOfDay::from_naive(self.endpoint(endpoint).time)
    }

    /// Normalized value of a field, if a date has been picked or committed
    pub fn value(&self, endpoint: Endpoint) -> Option<NaiveDateTime> {
        self.endpoint(endpoint).value()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Keystroke entry; nothing is parsed until commit or validation
    pub fn set_text(&mut self, endpoint: Endpoint, text: &str) {
        let input = self.endpoint_mut(endpoint);
        input.text = text.to_string();
        if text.trim().is_empty() {
            input.date = None;
        }
    }

    /// Field lost focus. Recognized text is absorbed into the picker state
    /// and redisplayed in canonical form; anything else is left untouched
    /// for validation to report. Date-only text keeps the current time.
    pub fn commit(&mut self, endpoint: Endpoint) -> bool {
        let input = self.endpoint_mut(endpoint);
        match parse_text(&input.text) {
            Some((date, time)) => {
                input.date = Some(date);
                if let Some(time) = time {
                    input.time = time;
                }
                input.sync_text();
                true
            }
            None => false,
        }
    }

    /// Calendar selection
    pub fn pick_date(&mut self, endpoint: Endpoint, date: NaiveDate) {
        let input = self.endpoint_mut(endpoint);
        input.date = Some(date);
        input.sync_text();
    }

    /// Time selector
    pub fn pick_time(&mut self, endpoint: Endpoint, time: TimeOfDay) -> Result<(), DateInputError> {
        let time = time.to_naive()?;
        let input = self.endpoint_mut(endpoint);
        input.time = time;
        input.sync_text();
        Ok(())
    }

    /// Validate both fields. On success errors are cleared and the range is
    /// returned; on failure the per-field errors are stored and returned.
    pub fn validate(&mut self) -> Result<DateRange, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut values = [None, None];

        for (slot, endpoint) in [Endpoint::From, Endpoint::To].into_iter().enumerate() {
            let input = self.endpoint(endpoint);
            if input.text.trim().is_empty() {
                errors.set(endpoint, DateInputError::Required(endpoint));
                continue;
            }
            match parse_text(&input.text) {
                Some((date, time)) => {
                    values[slot] = Some(date.and_time(time.unwrap_or(input.time)));
                }
                None => errors.set(endpoint, DateInputError::InvalidFormat(endpoint)),
            }
        }

        if let [Some(from), Some(to)] = values {
            match DateRange::new(from, to) {
                Ok(range) => {
                    self.errors = FieldErrors::default();
                    return Ok(range);
                }
                Err(e) => errors.set(e.endpoint(), e),
            }
        }

        self.errors = errors.clone();
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, WIRE_FORMAT).unwrap()
    }

    #[test]
    fn test_24_hour_text() {
        let range = DateRange::parse("2025-01-01 00:00:00", "2025-01-02 00:00:00").unwrap();
        assert_eq!(range.from_wire(), "2025-01-01 00:00:00");
        assert_eq!(range.to_wire(), "2025-01-02 00:00:00");
    }

    #[test]
    fn test_12_hour_text_is_normalized() {
        let range = DateRange::parse("2025-01-01 9:05 am", "2025-01-01 12:30:15 PM").unwrap();
        assert_eq!(range.from_wire(), "2025-01-01 09:05:00");
        assert_eq!(range.to_wire(), "2025-01-01 12:30:15");

        let midnight = DateRange::parse("2025-01-01 12:00 AM", "2025-01-01 12:00 AM").unwrap();
        assert_eq!(midnight.from_wire(), "2025-01-01 00:00:00");
    }

    #[test]
    fn test_equal_endpoints_are_valid() {
        assert!(DateRange::parse("2025-03-01 10:00:00", "2025-03-01 10:00:00").is_ok());
    }

    #[test]
    fn test_from_after_to_fails_on_to_field() {
        let errors = DateRange::parse("2025-01-02 00:00:00", "2025-01-01 00:00:00").unwrap_err();
        assert!(errors.from.is_none());
        assert_eq!(errors.to, Some(DateInputError::EndBeforeStart));
        assert_eq!(
            errors.to.unwrap().to_string(),
            "End date must be after start date"
        );
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        for bad in [
            "2025-1-01 00:00:00",
            "2025-02-30 00:00:00",
            "2025-01-01 25:00:00",
            "2025-01-01 0:30 PM",
            "2025-01-01 13:00 PM",
            "yesterday",
        ] {
            let errors = DateRange::parse(bad, "2025-12-31 00:00:00").unwrap_err();
            assert_eq!(
                errors.from,
                Some(DateInputError::InvalidFormat(Endpoint::From)),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_required_fields() {
        let mut input = DateTimeRangeInput::new();
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.from.as_ref().unwrap().to_string(), "Start date & time required");
        assert_eq!(errors.to.as_ref().unwrap().to_string(), "End date & time required");
        assert_eq!(input.errors(), &errors);
    }

    #[test]
    fn test_validation_does_not_rewrite_text() {
        let mut input = DateTimeRangeInput::new();
        input.set_text(Endpoint::From, "2025-05-02 08:00:00");
        input.set_text(Endpoint::To, "2025-05-01 08:00:00");

        assert!(input.validate().is_err());
        assert_eq!(input.text(Endpoint::From), "2025-05-02 08:00:00");
        assert_eq!(input.text(Endpoint::To), "2025-05-01 08:00:00");
    }

    #[test]
    fn test_picker_defaults_and_selection() {
        let mut input = DateTimeRangeInput::new();
        let day = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        input.pick_date(Endpoint::From, day);
        input.pick_date(Endpoint::To, day);

        assert_eq!(input.text(Endpoint::From), "2025-04-10 00:00:00");
        assert_eq!(input.text(Endpoint::To), "2025-04-10 12:00:00");

        input
            .pick_time(Endpoint::To, TimeOfDay::new(3, 45, Meridiem::Pm))
            .unwrap();
        assert_eq!(input.value(Endpoint::To), Some(dt("2025-04-10 15:45:00")));
        assert_eq!(input.time(Endpoint::To).to_string(), "03:45 PM");

        let range = input.validate().unwrap();
        assert_eq!(range.to_wire(), "2025-04-10 15:45:00");
    }

    #[test]
    fn test_commit_keeps_time_for_date_only_text() {
        let mut input = DateTimeRangeInput::new();
        input
            .pick_time(Endpoint::From, TimeOfDay::new(7, 15, Meridiem::Am))
            .unwrap();
        input.set_text(Endpoint::From, "2025-06-01");

        assert!(input.commit(Endpoint::From));
        assert_eq!(input.text(Endpoint::From), "2025-06-01 07:15:00");

        input.set_text(Endpoint::From, "not a date");
        assert!(!input.commit(Endpoint::From));
        assert_eq!(input.text(Endpoint::From), "not a date");
    }

    #[test]
    fn test_invalid_picker_time() {
        assert_eq!(
            TimeOfDay::new(0, 10, Meridiem::Am).to_naive(),
            Err(DateInputError::InvalidTime { hour: 0, minute: 10 })
        );
    }
}
