//! RECUR values (RFC 5545 §3.3.10).
//!
//! The model keeps the rule as written. Expansion hands the text form to the
//! `rrule` crate, so `Display` must round-trip every part the parser accepts.

use std::fmt;

use super::{Date, DateTime};

/// Declares a keyword enum with case-insensitive parsing and its wire spelling.
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $word:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $word),+
                }
            }

            #[must_use]
            pub fn parse(word: &str) -> Option<Self> {
                $(
                    if word.eq_ignore_ascii_case($word) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum!(
    /// FREQ part.
    Frequency {
        Secondly => "SECONDLY",
        Minutely => "MINUTELY",
        Hourly => "HOURLY",
        Daily => "DAILY",
        Weekly => "WEEKLY",
        Monthly => "MONTHLY",
        Yearly => "YEARLY",
    }
);

keyword_enum!(
    /// Two-letter day codes used by BYDAY and WKST.
    Weekday {
        Sunday => "SU",
        Monday => "MO",
        Tuesday => "TU",
        Wednesday => "WE",
        Thursday => "TH",
        Friday => "FR",
        Saturday => "SA",
    }
);

/// One BYDAY entry: `TU`, `2MO`, `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Nth occurrence within the month or year, negative counting from the end.
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ordinal {
            Some(nth) => write!(f, "{nth}{}", self.weekday),
            None => write!(f, "{}", self.weekday),
        }
    }
}

/// UNTIL follows the value type of DTSTART.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRuleUntil {
    Date(Date),
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => date.fmt(f),
            Self::DateTime(datetime) => datetime.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RRule {
    pub freq: Option<Frequency>,
    /// Absent means 1.
    pub interval: Option<u32>,
    pub until: Option<RRuleUntil>,
    pub count: Option<u32>,
    pub wkst: Option<Weekday>,
    pub by_second: Vec<u8>,
    pub by_minute: Vec<u8>,
    pub by_hour: Vec<u8>,
    pub by_day: Vec<WeekdayNum>,
    pub by_monthday: Vec<i8>,
    pub by_yearday: Vec<i16>,
    pub by_weekno: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_setpos: Vec<i16>,
}

impl RRule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The same rule bounded by `until` instead.
    #[must_use]
    pub fn with_until(&self, until: Option<RRuleUntil>) -> Self {
        let mut rule = self.clone();
        rule.until = until;
        rule
    }
}

/// Writes `;NAME=a,b,c`, or nothing for an empty list.
fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, name: &str, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i == 0 {
            write!(f, ";{name}={item}")?;
        } else {
            write!(f, ",{item}")?;
        }
    }
    Ok(())
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // FREQ always leads, so every later part starts with a separator.
        match self.freq {
            Some(freq) => write!(f, "FREQ={freq}")?,
            None => f.write_str("FREQ=")?,
        }
        if let Some(interval) = self.interval.filter(|&n| n != 1) {
            write!(f, ";INTERVAL={interval}")?;
        }
        if let Some(until) = &self.until {
            write!(f, ";UNTIL={until}")?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        if let Some(wkst) = self.wkst {
            write!(f, ";WKST={wkst}")?;
        }
        write_list(f, "BYSECOND", &self.by_second)?;
        write_list(f, "BYMINUTE", &self.by_minute)?;
        write_list(f, "BYHOUR", &self.by_hour)?;
        write_list(f, "BYDAY", &self.by_day)?;
        write_list(f, "BYMONTHDAY", &self.by_monthday)?;
        write_list(f, "BYYEARDAY", &self.by_yearday)?;
        write_list(f, "BYWEEKNO", &self.by_weekno)?;
        write_list(f, "BYMONTH", &self.by_month)?;
        write_list(f, "BYSETPOS", &self.by_setpos)
    }
}
