//! Department wall clock.
//!
//! Timestamps are recorded as naive local date-times in the department's
//! configured offset, so "today" and calendar-date grouping agree with what
//! users see on their screens.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Fixed-offset clock shared through the application state.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Current local wall-clock time, truncated to whole seconds.
    pub fn now(&self) -> NaiveDateTime {
        let local = Utc::now().with_timezone(&self.offset).naive_local();
        local.with_nanosecond(0).unwrap_or(local)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current local calendar date.
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Parse a date or date-time as sent by the frontend.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and
/// RFC 3339 strings (the latter converted to the given offset).
pub fn parse_local_datetime(raw: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&offset).naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse the calendar-date part of a date or date-time string.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
