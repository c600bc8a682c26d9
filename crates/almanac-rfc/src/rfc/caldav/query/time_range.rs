//! CALDAV:time-range (RFC 4791 §9.9).

use chrono::{DateTime, Utc};

use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::intersects;
use crate::rfc::ical::parse::parse_datetime;

/// A half-open UTC period; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    /// Start of range (inclusive).
    pub start: Option<DateTime<Utc>>,
    /// End of range (exclusive).
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Creates a range starting from a time.
    #[must_use]
    pub fn from(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Creates a range ending at a time.
    #[must_use]
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// ## Summary
    /// Parses the `start` and `end` attributes of a time-range element.
    ///
    /// ## Errors
    /// Returns a validation error if a bound is not a UTC date-time, if both
    /// bounds are missing, or if `start` is after `end`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> RfcResult<Self> {
        if start.is_none() && end.is_none() {
            return Err(RfcError::ValidationError(
                "time-range needs a start or an end".to_string(),
            ));
        }

        let range = Self {
            start: start.map(parse_utc).transpose()?,
            end: end.map(parse_utc).transpose()?,
        };
        if let (Some(s), Some(e)) = (range.start, range.end)
            && s > e
        {
            return Err(RfcError::ValidationError(format!(
                "time-range start {s} is after end {e}"
            )));
        }
        Ok(range)
    }

    /// Returns the bounds with open ends replaced by the extreme instants.
    #[must_use]
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start.unwrap_or(DateTime::<Utc>::MIN_UTC),
            self.end.unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Returns whether `[start, end)` overlaps this range; `start == end` is a point.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let (lo, hi) = self.bounds();
        intersects(start, end, lo, hi)
    }

    /// Returns whether an instant falls within `[start, end)`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.overlaps(instant, instant)
    }
}

fn parse_utc(text: &str) -> RfcResult<DateTime<Utc>> {
    let dt = parse_datetime(text, None, 1, 1)?;
    if !dt.is_utc() {
        return Err(RfcError::ValidationError(format!(
            "time-range value must be UTC: {text}"
        )));
    }
    dt.naive()
        .map(|naive| naive.and_utc())
        .ok_or_else(|| RfcError::ValidationError(format!("invalid time-range value: {text}")))
}
