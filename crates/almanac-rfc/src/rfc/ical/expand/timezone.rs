//! Timezone resolution for iCalendar TZIDs.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and IANA alias
//! canonicalization, and `chrono-tz` for the zone rules themselves.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use almanac_core::config::TimezoneConfig;

/// Error during timezone resolution or conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Date or time fields that do not form a real date-time.
    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),
}

static GLOBAL: LazyLock<TimeZoneRegistry> = LazyLock::new(TimeZoneRegistry::new);

/// Read-only resolver from TZID strings to `chrono_tz` zones.
///
/// Built once (from config or as [`TimeZoneRegistry::global`]) and shared by
/// reference; resolution never mutates it.
#[derive(Debug, Clone, Default)]
pub struct TimeZoneRegistry {
    /// Extra aliases keyed by lowercase TZID.
    aliases: HashMap<String, Tz>,
    /// Zone for floating values when the caller supplies none.
    default_zone: Option<Tz>,
}

impl TimeZoneRegistry {
    /// Creates a registry with no aliases and no default zone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared registry with built-in resolution only.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// ## Summary
    /// Builds a registry from the `[timezone]` configuration section.
    ///
    /// ## Errors
    /// Returns `ConversionError::UnknownTimezone` if the default zone or an
    /// alias target is not a resolvable timezone.
    pub fn from_config(config: &TimezoneConfig) -> Result<Self, ConversionError> {
        let mut registry = Self::new();

        for (alias, target) in &config.aliases {
            let tz = registry.resolve(target)?;
            registry = registry.with_alias(alias, tz);
        }

        if let Some(tzid) = config.default_tzid.as_deref() {
            registry.default_zone = Some(registry.resolve(tzid)?);
        }

        tracing::debug!(
            aliases = registry.aliases.len(),
            default_zone = ?registry.default_zone,
            "Timezone registry built"
        );

        Ok(registry)
    }

    /// Adds an alias that resolves to `tz`. Matching ignores case.
    #[must_use]
    pub fn with_alias(mut self, alias: &str, tz: Tz) -> Self {
        self.aliases.insert(alias.to_lowercase(), tz);
        self
    }

    /// Sets the zone used for floating values when none is supplied.
    #[must_use]
    pub fn with_default_zone(mut self, tz: Tz) -> Self {
        self.default_zone = Some(tz);
        self
    }

    /// Returns the configured default zone for floating values.
    #[must_use]
    pub fn default_zone(&self) -> Option<Tz> {
        self.default_zone
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Resolution order: vendor prefix stripping, configured aliases, ICU
    /// canonicalization (Windows names, IANA links), then `chrono-tz` directly.
    ///
    /// ## Errors
    /// Returns `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn resolve(&self, tzid: &str) -> Result<Tz, ConversionError> {
        let stripped = strip_vendor_prefix(tzid.trim());

        if let Some(tz) = self.aliases.get(&stripped.to_lowercase()) {
            return Ok(*tz);
        }

        normalize_tzid(stripped)
            .and_then(|canonical| Tz::from_str(&canonical).ok())
            .or_else(|| Tz::from_str(stripped).ok())
            .ok_or_else(|| ConversionError::UnknownTimezone(tzid.to_string()))
    }
}

fn strip_vendor_prefix(tzid: &str) -> &str {
    tzid.strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid)
}

/// Maps Windows zone names and IANA links to canonical IANA names.
fn normalize_tzid(tzid: &str) -> Option<String> {
    let iana_parser = IanaParserExtended::new();

    if let Some(tz) = WindowsParser::new().parse(tzid, None) {
        return iana_parser
            .iter()
            .find(|entry| entry.time_zone == tz)
            .map(|entry| entry.canonical.to_string());
    }

    let parsed = iana_parser.parse(tzid);
    (parsed.time_zone != icu::time::TimeZone::UNKNOWN).then(|| parsed.canonical.to_string())
}

/// ## Summary
/// Places a wall-clock time in a zone.
///
/// Ambiguous times (DST fold) take the earlier instant. Non-existent times
/// (DST gap) are shifted forward by one hour.
#[must_use]
pub fn localize(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => local
            .checked_add_signed(TimeDelta::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
            .unwrap_or_else(|| tz.from_utc_datetime(&local)),
    }
}
