//! DATE, PERIOD and the typed [`Value`] of a property (RFC 5545 §3.3).

use std::fmt;

use chrono::NaiveDate;

use super::{DateTime, Duration, RRule, Time, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// `None` for dates that do not exist, e.g. February 30.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// `start/end` or `start/duration` (RFC 5545 §3.3.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Explicit { start: DateTime, end: DateTime },
    Duration { start: DateTime, duration: Duration },
}

impl Period {
    #[must_use]
    pub fn explicit(start: DateTime, end: DateTime) -> Self {
        Self::Explicit { start, end }
    }

    #[must_use]
    pub fn from_duration(start: DateTime, duration: Duration) -> Self {
        Self::Duration { start, duration }
    }

    #[must_use]
    pub fn start(&self) -> &DateTime {
        let (Self::Explicit { start, .. } | Self::Duration { start, .. }) = self;
        start
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// A property value converted to its declared or default type.
///
/// RDATE, EXDATE and FREEBUSY may carry several comma-separated values and
/// use the list variants; every other multi-value property stays as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Decoded base64.
    Binary(Vec<u8>),
    Boolean(bool),
    CalAddress(String),
    Date(Date),
    DateList(Vec<Date>),
    DateTime(DateTime),
    DateTimeList(Vec<DateTime>),
    Duration(Duration),
    Float(f64),
    Integer(i32),
    Period(Period),
    PeriodList(Vec<Period>),
    Recur(Box<RRule>),
    /// Unescaped.
    Text(String),
    Time(Time),
    Uri(String),
    UtcOffset(UtcOffset),
    /// An X- or IANA type, kept as written.
    Unknown(String),
}

/// `fn $name(&self) -> Option<$out>` for a single variant.
macro_rules! single {
    ($name:ident, $variant:ident, $out:ty) => {
        #[must_use]
        pub fn $name(&self) -> Option<$out> {
            if let Self::$variant(inner) = self { Some(inner) } else { None }
        }
    };
}

/// `fn $name(&self) -> Vec<&$item>` accepting the single or list variant.
macro_rules! many {
    ($name:ident, $one:ident, $list:ident, $item:ty) => {
        #[must_use]
        pub fn $name(&self) -> Vec<&$item> {
            match self {
                Self::$one(item) => vec![item],
                Self::$list(items) => items.iter().collect(),
                _ => Vec::new(),
            }
        }
    };
}

impl Value {
    single!(as_text, Text, &str);
    single!(as_datetime, DateTime, &DateTime);
    single!(as_date, Date, &Date);
    single!(as_duration, Duration, &Duration);
    single!(as_recur, Recur, &RRule);

    many!(as_datetime_list, DateTime, DateTimeList, DateTime);
    many!(as_date_list, Date, DateList, Date);
    many!(as_period_list, Period, PeriodList, Period);

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        if let Self::Integer(n) = self { Some(*n) } else { None }
    }
}
