//! Date and date-time values with their RFC 5545 form preserved.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::timezone::{ConversionError, TimeZoneRegistry, localize};
use crate::rfc::ical::core::{self as ical, Period, Property, Value};

const SECONDS_PER_DAY: i64 = 86_400;

/// A DATE or DATE-TIME value that remembers how it was written.
///
/// A date never carries a zone; a date-time is exactly one of floating,
/// UTC, or zoned. All comparisons go through [`TemporalValue::to_instant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalValue {
    /// `VALUE=DATE`
    DateOnly(NaiveDate),
    /// Local time with no zone.
    Floating(NaiveDateTime),
    /// `...Z`
    Utc(DateTime<Utc>),
    /// Local time in a resolved zone, with the TZID as written.
    Zoned(DateTime<Tz>, String),
}

impl TemporalValue {
    /// ## Summary
    /// Converts a parsed DATE-TIME.
    ///
    /// A TZID the registry cannot resolve degrades the value to floating.
    ///
    /// ## Errors
    /// Returns `ConversionError::InvalidDateTime` if the fields do not form a real date-time.
    pub fn from_datetime(
        dt: &ical::DateTime,
        registry: &TimeZoneRegistry,
    ) -> Result<Self, ConversionError> {
        let naive = dt
            .naive()
            .ok_or_else(|| ConversionError::InvalidDateTime(dt.to_string()))?;

        Ok(match &dt.form {
            ical::DateTimeForm::Utc => Self::Utc(naive.and_utc()),
            ical::DateTimeForm::Floating => Self::Floating(naive),
            ical::DateTimeForm::Zoned { tzid } => match registry.resolve(tzid) {
                Ok(tz) => Self::Zoned(localize(tz, naive), tzid.clone()),
                Err(e) => {
                    tracing::warn!(tzid = %tzid, error = %e, "Treating date-time as floating");
                    Self::Floating(naive)
                }
            },
        })
    }

    /// ## Summary
    /// Converts a parsed DATE.
    ///
    /// ## Errors
    /// Returns `ConversionError::InvalidDateTime` if the fields do not form a real date.
    pub fn from_date(date: &ical::Date) -> Result<Self, ConversionError> {
        date.naive()
            .map(Self::DateOnly)
            .ok_or_else(|| ConversionError::InvalidDateTime(date.to_string()))
    }

    /// ## Summary
    /// Reads a single DATE or DATE-TIME property value.
    ///
    /// Returns `None` for any other value type.
    ///
    /// ## Errors
    /// Returns an error if the value holds an impossible date.
    pub fn from_property(
        prop: &Property,
        registry: &TimeZoneRegistry,
    ) -> Result<Option<Self>, ConversionError> {
        match &prop.value {
            Value::DateTime(dt) => Self::from_datetime(dt, registry).map(Some),
            Value::Date(d) => Self::from_date(d).map(Some),
            _ => Ok(None),
        }
    }

    /// ## Summary
    /// Reads every DATE and DATE-TIME carried by a (possibly list-valued) property.
    ///
    /// ## Errors
    /// Returns an error if any value holds an impossible date.
    pub fn list_from_property(
        prop: &Property,
        registry: &TimeZoneRegistry,
    ) -> Result<Vec<Self>, ConversionError> {
        let datetimes = prop
            .value
            .as_datetime_list()
            .into_iter()
            .map(|dt| Self::from_datetime(dt, registry));
        let dates = prop.value.as_date_list().into_iter().map(Self::from_date);
        datetimes.chain(dates).collect()
    }

    /// ## Summary
    /// Resolves a PERIOD into its start and end values.
    ///
    /// ## Errors
    /// Returns an error if either bound holds an impossible date-time.
    pub fn period_bounds(
        period: &Period,
        registry: &TimeZoneRegistry,
    ) -> Result<(Self, Self), ConversionError> {
        let start = Self::from_datetime(period.start(), registry)?;
        let end = match period {
            Period::Explicit { end, .. } => Self::from_datetime(end, registry)?,
            Period::Duration { duration, .. } => start
                .checked_add(duration.to_chrono())
                .ok_or_else(|| ConversionError::InvalidDateTime(period.to_string()))?,
        };
        Ok((start, end))
    }

    /// Returns whether this is a `VALUE=DATE` value.
    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, Self::DateOnly(_))
    }

    /// Returns whether this value needs a zone to become an instant.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::DateOnly(_) | Self::Floating(_))
    }

    /// Returns the resolved zone of a zoned value.
    #[must_use]
    pub fn zone(&self) -> Option<Tz> {
        match self {
            Self::Zoned(dt, _) => Some(dt.timezone()),
            _ => None,
        }
    }

    /// ## Summary
    /// Converts to an absolute instant.
    ///
    /// Dates (at midnight) and floating values are read in `floating_zone`,
    /// or as UTC when none is given.
    #[must_use]
    pub fn to_instant(&self, floating_zone: Option<Tz>) -> DateTime<Utc> {
        match self {
            Self::Utc(dt) => *dt,
            Self::Zoned(dt, _) => dt.with_timezone(&Utc),
            Self::DateOnly(_) | Self::Floating(_) => {
                let wall = self.wall_clock();
                floating_zone.map_or_else(
                    || wall.and_utc(),
                    |tz| localize(tz, wall).with_timezone(&Utc),
                )
            }
        }
    }

    /// Projects a date-time to UTC. Dates stay dates.
    #[must_use]
    pub fn to_utc(&self, floating_zone: Option<Tz>) -> Self {
        match self {
            Self::DateOnly(_) => self.clone(),
            _ => Self::Utc(self.to_instant(floating_zone)),
        }
    }

    /// Returns the local wall-clock reading (midnight for dates).
    #[must_use]
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::DateOnly(d) => d.and_time(NaiveTime::MIN),
            Self::Floating(dt) => *dt,
            Self::Utc(dt) => dt.naive_utc(),
            Self::Zoned(dt, _) => dt.naive_local(),
        }
    }

    /// Returns a value of the same form and zone at another wall-clock time.
    #[must_use]
    pub fn with_wall_clock(&self, wall: NaiveDateTime) -> Self {
        match self {
            Self::DateOnly(_) => Self::DateOnly(wall.date()),
            Self::Floating(_) => Self::Floating(wall),
            Self::Utc(_) => Self::Utc(wall.and_utc()),
            Self::Zoned(dt, tzid) => Self::Zoned(localize(dt.timezone(), wall), tzid.clone()),
        }
    }

    /// ## Summary
    /// Reads an instant as a wall-clock time in this value's zone.
    ///
    /// Dates and floating values use `floating_zone` (UTC when none).
    #[must_use]
    pub fn wall_clock_of(&self, instant: DateTime<Utc>, floating_zone: Option<Tz>) -> NaiveDateTime {
        match self {
            Self::Utc(_) => instant.naive_utc(),
            Self::Zoned(dt, _) => instant.with_timezone(&dt.timezone()).naive_local(),
            Self::DateOnly(_) | Self::Floating(_) => floating_zone.map_or_else(
                || instant.naive_utc(),
                |tz| instant.with_timezone(&tz).naive_local(),
            ),
        }
    }

    /// ## Summary
    /// Adds a time delta, returning `None` on overflow.
    ///
    /// Dates stay dates when the delta is a whole number of days; otherwise
    /// they become floating date-times.
    #[must_use]
    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        match self {
            Self::DateOnly(d) if delta.num_seconds() % SECONDS_PER_DAY == 0 && delta.subsec_nanos() == 0 => {
                let days = delta.num_days();
                let shifted = if days >= 0 {
                    d.checked_add_days(Days::new(days.unsigned_abs()))
                } else {
                    d.checked_sub_days(Days::new(days.unsigned_abs()))
                };
                shifted.map(Self::DateOnly)
            }
            Self::DateOnly(_) | Self::Floating(_) => self
                .wall_clock()
                .checked_add_signed(delta)
                .map(Self::Floating),
            Self::Utc(dt) => dt.checked_add_signed(delta).map(Self::Utc),
            Self::Zoned(dt, tzid) => dt
                .checked_add_signed(delta)
                .map(|shifted| Self::Zoned(shifted, tzid.clone())),
        }
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateOnly(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::Floating(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%S")),
            Self::Utc(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%SZ")),
            Self::Zoned(dt, _) => write!(f, "{}", dt.format("%Y%m%dT%H%M%S")),
        }
    }
}
