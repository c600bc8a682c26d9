//! DATE-TIME, TIME and UTC-OFFSET values (RFC 5545 §3.3.5, §3.3.12, §3.3.14).

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

use super::Date;

/// Signed offset from UTC in seconds, e.g. TZOFFSETFROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset(i32);

impl UtcOffset {
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self(seconds)
    }

    #[must_use]
    pub const fn as_seconds(self) -> i32 {
        self.0
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        let minutes = self.0.unsigned_abs() / 60;
        write!(f, "{sign}{:02}{:02}", minutes / 60, minutes % 60)
    }
}

/// A TIME value. `second` may be 60 for a leap second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub is_utc: bool,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zulu = if self.is_utc { "Z" } else { "" };
        write!(f, "{:02}{:02}{:02}{zulu}", self.hour, self.minute, self.second)
    }
}

/// How a DATE-TIME is anchored to the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeForm {
    /// No zone: the same wall clock everywhere.
    Floating,
    /// Trailing `Z`.
    Utc,
    /// Wall clock in the zone named by TZID, kept as written.
    Zoned { tzid: String },
}

/// A DATE-TIME exactly as written. Resolving it to an instant is the
/// expansion layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub fn floating(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let (date, time) = (Date::new(year, month, day), Time { hour, minute, second, is_utc: false });
        Self::from_parts(date, time, DateTimeForm::Floating)
    }

    #[must_use]
    pub fn utc(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let mut datetime = Self::floating(year, month, day, hour, minute, second);
        datetime.form = DateTimeForm::Utc;
        datetime
    }

    #[must_use]
    pub fn zoned(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        tzid: impl Into<String>,
    ) -> Self {
        let mut datetime = Self::floating(year, month, day, hour, minute, second);
        datetime.form = DateTimeForm::Zoned { tzid: tzid.into() };
        datetime
    }

    /// Joins a DATE and a TIME. The TIME's `Z` flag is ignored in favour of `form`.
    #[must_use]
    pub fn from_parts(date: Date, time: Time, form: DateTimeForm) -> Self {
        Self {
            year: date.year,
            month: date.month,
            day: date.day,
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            form,
        }
    }

    #[must_use]
    pub fn date(&self) -> Date {
        Date::new(self.year, self.month, self.day)
    }

    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.form == DateTimeForm::Utc
    }

    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.form == DateTimeForm::Floating
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        if let DateTimeForm::Zoned { tzid } = &self.form {
            Some(tzid)
        } else {
            None
        }
    }

    /// The wall clock as a chrono value, `None` for impossible fields.
    /// A leap second reads as :59.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_opt(
            self.hour.into(),
            self.minute.into(),
            self.second.min(59).into(),
        )?;
        Some(self.date().naive()?.and_time(time))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = Time {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            is_utc: self.is_utc(),
        };
        write!(f, "{}T{time}", self.date())
    }
}
