//! iCalendar core models (RFC 5545).
//!
//! These types hold a parsed calendar exactly as written: date-time values
//! keep their floating/UTC/zoned form and unknown properties are preserved.
//! Interpretation (timezones, recurrence) happens in [`super::expand`].

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod rrule;
mod value;

pub use component::{Component, ComponentKind, ICalendar};
pub use datetime::{DateTime, DateTimeForm, Time, UtcOffset};
pub use duration::Duration;
pub use parameter::{Parameter, TriggerRelated, names as param_names};
pub use property::{ContentLine, Property, names};
pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
pub use value::{Date, Period, Value};
