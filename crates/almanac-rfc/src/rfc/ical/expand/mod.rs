//! Interpretation of parsed calendar data: timezones, temporal values and
//! recurrence expansion.

mod instance;
mod recurrence;
mod temporal;
mod timezone;

pub use instance::{Instance, InstanceList, intersects};
pub(crate) use instance::{default_duration, explicit_duration};
pub use recurrence::{ExpansionOptions, Occurrence, RecurrenceSet};
pub use temporal::TemporalValue;
pub use timezone::{ConversionError, TimeZoneRegistry, localize};
