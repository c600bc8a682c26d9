//! Content lines and typed properties (RFC 5545 §3.1, §3.8).

use super::parameter::{self, names as param};
use super::{Date, DateTime, Duration, Parameter, Value};

/// An unfolded line split into name, parameters and the value text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    pub params: Vec<Parameter>,
    /// Still escaped.
    pub raw_value: String,
}

impl ContentLine {
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        parameter::find(&self.params, name)?.value()
    }

    /// Explicit VALUE type, overriding the property's default.
    #[must_use]
    pub fn value_type(&self) -> Option<&str> {
        self.get_param_value(param::VALUE)
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.get_param_value(param::TZID)
    }
}

/// A property whose value has been converted to its type.
///
/// `raw_value` keeps the text as written for matching and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: Value,
    pub raw_value: String,
}

impl Property {
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        parameter::find(&self.params, name)
    }

    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        self.value.as_integer()
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        self.value.as_datetime()
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&Date> {
        self.value.as_date()
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        self.value.as_duration()
    }

    /// What a text-match sees: unescaped TEXT, otherwise the value as written.
    #[must_use]
    pub fn match_text(&self) -> &str {
        self.as_text().unwrap_or(&self.raw_value)
    }
}

pub mod names {
    pub const PRODID: &str = "PRODID";
    pub const VERSION: &str = "VERSION";
    pub const SUMMARY: &str = "SUMMARY";
    pub const UID: &str = "UID";

    pub const COMPLETED: &str = "COMPLETED";
    pub const CREATED: &str = "CREATED";
    pub const DTEND: &str = "DTEND";
    pub const DTSTAMP: &str = "DTSTAMP";
    pub const DTSTART: &str = "DTSTART";
    pub const DUE: &str = "DUE";
    pub const DURATION: &str = "DURATION";
    pub const FREEBUSY: &str = "FREEBUSY";

    pub const EXDATE: &str = "EXDATE";
    pub const EXRULE: &str = "EXRULE";
    pub const RDATE: &str = "RDATE";
    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const RRULE: &str = "RRULE";

    pub const ACTION: &str = "ACTION";
    pub const REPEAT: &str = "REPEAT";
    pub const TRIGGER: &str = "TRIGGER";
}
