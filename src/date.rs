use anyhow::{Context, Result};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Simple "YYYY-MM" month bucket with ordering, used as the recap's `bulan` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8, // 1..=12
}

impl YearMonth {
    /// Bucket a calendar date into its month.
    pub fn of(date: Date) -> Self {
        Self { year: date.year().clamp(0, u16::MAX as i32) as u16, month: u8::from(date.month()) }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive calendar-day window applied to post dates (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Date,
    pub end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Window from `start` up to today (UTC).
    pub fn since(start: Date) -> Self {
        Self { start, end: OffsetDateTime::now_utc().date() }
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_ymd(s: &str) -> Result<Date> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s.trim(), &fmt).with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s.trim()))
}

/// Whole days from `earlier` to `later` (negative when `later` precedes `earlier`).
pub fn days_between(later: Date, earlier: Date) -> i64 {
    (later - earlier).whole_days()
}

/// ISO-8601 / RFC 3339 rendering used for every timestamp column.
pub fn iso8601(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Convert an epoch-seconds value from the remote API into a UTC timestamp.
pub fn from_epoch(secs: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs).with_context(|| format!("timestamp out of range: {secs}"))
}
