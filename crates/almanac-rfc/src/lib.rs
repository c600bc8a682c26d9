//! iCalendar model, recurrence expansion and `CalDAV` query filtering.

pub mod error;
pub mod rfc;
