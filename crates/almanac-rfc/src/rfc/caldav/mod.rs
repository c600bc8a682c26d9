//! `CalDAV` (RFC 4791) query evaluation.

pub mod query;
