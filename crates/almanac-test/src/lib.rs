//! Almanac integration test support: `.ics` fixtures and time helpers.

use std::path::PathBuf;

use almanac_rfc::rfc::caldav::query::TimeRange;
use almanac_rfc::rfc::ical::core::ICalendar;
use almanac_rfc::rfc::ical::parse::parse;
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Returns the path of a file under `fixtures/`.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// ## Summary
/// Reads and parses a fixture calendar.
///
/// ## Errors
/// Returns an error if the fixture is missing or does not parse.
pub fn load_fixture(name: &str) -> anyhow::Result<ICalendar> {
    let path = fixture_path(name);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let calendar = parse(&text).with_context(|| format!("Failed to parse fixture {name}"))?;
    tracing::debug!(fixture = name, uids = ?calendar.uids(), "Fixture loaded");
    Ok(calendar)
}

/// ## Summary
/// Parses a UTC date-time such as `20060102T140000Z`.
///
/// ## Errors
/// Returns an error for anything but a UTC date-time.
pub fn utc(text: &str) -> anyhow::Result<DateTime<Utc>> {
    TimeRange::parse(Some(text), None)?
        .start
        .with_context(|| format!("No instant in {text}"))
}

/// ## Summary
/// Parses a closed UTC range.
///
/// ## Errors
/// Returns an error if either bound is not UTC or the range is inverted.
pub fn range(start: &str, end: &str) -> anyhow::Result<TimeRange> {
    Ok(TimeRange::parse(Some(start), Some(end))?)
}
