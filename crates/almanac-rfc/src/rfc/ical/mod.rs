//! iCalendar (RFC 5545) support: data model, parser and instance expansion.

pub mod core;
pub mod expand;
pub mod parse;
