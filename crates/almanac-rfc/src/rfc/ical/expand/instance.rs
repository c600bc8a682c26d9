//! Concrete occurrences of a recurring component within a time range.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::recurrence::{ExpansionOptions, RecurrenceSet};
use super::temporal::TemporalValue;
use super::timezone::{ConversionError, TimeZoneRegistry};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{Component, names, param_names};

const THIS_AND_FUTURE: &str = "THISANDFUTURE";

/// One occurrence of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub start: TemporalValue,
    pub end: TemporalValue,
    /// Whether this occurrence comes from an override component.
    pub is_override: bool,
    /// The occurrence this instance stands for, as written or generated.
    pub recurrence_id: TemporalValue,
}

/// ## Summary
/// Returns whether `[start, end)` overlaps `[range_start, range_end)`.
///
/// A zero-length span matches when `range_start <= start < range_end`.
#[must_use]
pub fn intersects(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> bool {
    if start == end {
        range_start <= start && start < range_end
    } else {
        start < range_end && end > range_start
    }
}

type Key = (DateTime<Utc>, String);

/// What overrides sharing a master's UID need from it.
#[derive(Debug, Clone)]
struct Master {
    start: TemporalValue,
    duration: TimeDelta,
    /// `None` for a master without RRULE or RDATE.
    recurrence: Option<RecurrenceSet>,
}

/// Time-ordered occurrences keyed by their recurrence instant.
///
/// Keys are `YYYYMMDD` for dates, `YYYYMMDDTHHMMSSZ` for UTC and zoned
/// instants, and `YYYYMMDDTHHMMSS` for floating instants when the list has
/// no timezone (with one, floating instants are projected and keyed in UTC).
/// An override's RECURRENCE-ID is keyed in the form of its master's DTSTART.
#[derive(Debug, Clone)]
pub struct InstanceList<'r> {
    instances: BTreeMap<Key, Instance>,
    /// Key text to instant, for lookups by key.
    index: HashMap<String, DateTime<Utc>>,
    utc: bool,
    timezone: Option<Tz>,
    registry: &'r TimeZoneRegistry,
    options: ExpansionOptions,
    masters: HashMap<String, Master>,
    warnings: Vec<ConversionError>,
}

impl Default for InstanceList<'static> {
    fn default() -> Self {
        Self::new(TimeZoneRegistry::global())
    }
}

impl<'r> InstanceList<'r> {
    /// Creates an empty list reading TZIDs through `registry`.
    ///
    /// The registry's default zone, if any, becomes the list's timezone.
    #[must_use]
    pub fn new(registry: &'r TimeZoneRegistry) -> Self {
        Self {
            instances: BTreeMap::new(),
            index: HashMap::new(),
            utc: false,
            timezone: registry.default_zone(),
            registry,
            options: ExpansionOptions::default(),
            masters: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Projects every date-time start and end to UTC when set.
    #[must_use]
    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    /// Sets the zone used for floating values.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ExpansionOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.utc
    }

    #[must_use]
    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    /// TZIDs the registry could not resolve. Values carrying them were read
    /// as floating.
    #[must_use]
    pub fn warnings(&self) -> &[ConversionError] {
        &self.warnings
    }

    /// ## Summary
    /// Adds the occurrences of a master component that intersect the range.
    ///
    /// A component without RRULE or RDATE contributes at most one instance.
    /// Components without DTSTART (or DUE) contribute nothing.
    ///
    /// ## Errors
    /// Returns a validation error if `master` has a RECURRENCE-ID or the range
    /// is inverted, and propagates malformed dates and rules.
    #[tracing::instrument(skip_all, fields(uid = master.uid().unwrap_or_default()))]
    pub fn add_component(
        &mut self,
        master: &Component,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> RfcResult<()> {
        if master.is_override() {
            return Err(RfcError::ValidationError(
                "master component must not carry RECURRENCE-ID".to_string(),
            ));
        }
        check_range(range_start, range_end)?;
        self.note_unresolved(master);

        let Some(start) = self.read_start(master)? else {
            tracing::debug!("Component has no start, nothing to expand");
            return Ok(());
        };

        let duration = explicit_duration(master, &start, self.registry, self.timezone)?
            .unwrap_or_else(|| default_duration(&start));

        if !master.is_recurring() {
            self.remember(master, start.clone(), duration, None);
            let end = shift(&start, duration)?;
            self.insert_plain(start.clone(), start, end, range_start, range_end);
            return Ok(());
        }

        let window_start = range_start
            .checked_sub_signed(duration.abs())
            .unwrap_or(range_start);
        let recurrence = RecurrenceSet::from_component(master, start.clone(), self.registry)?;
        let occurrences =
            recurrence.occurrences(window_start, range_end, self.timezone, &self.options)?;
        self.remember(master, start, duration, Some(recurrence));

        let before = self.instances.len();
        for occurrence in occurrences {
            let end = match occurrence.end {
                Some(end) => end,
                None => shift(&occurrence.start, duration)?,
            };
            self.insert_plain(
                occurrence.start.clone(),
                occurrence.start,
                end,
                range_start,
                range_end,
            );
        }

        tracing::debug!(
            added = self.instances.len().saturating_sub(before),
            total = self.instances.len(),
            "Expanded master component"
        );
        Ok(())
    }

    /// ## Summary
    /// Applies an override component to the occurrence named by its RECURRENCE-ID.
    ///
    /// The RECURRENCE-ID is read in the form of the DTSTART of the master
    /// added earlier with the same UID. The override's end comes from DTEND,
    /// DURATION, that master's duration, or the date/zero default.
    /// An override that falls outside the range removes the occurrence it
    /// replaces. With `RANGE=THISANDFUTURE`, later occurrences are moved by
    /// the same offset and take the override's duration.
    ///
    /// ## Errors
    /// Returns a validation error if the component has no RECURRENCE-ID or
    /// the range is inverted, and propagates malformed dates.
    #[tracing::instrument(skip_all, fields(uid = component.uid().unwrap_or_default()))]
    pub fn add_override(
        &mut self,
        component: &Component,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> RfcResult<()> {
        let Some(rid_prop) = component.recurrence_id() else {
            return Err(RfcError::ValidationError(
                "override component has no RECURRENCE-ID".to_string(),
            ));
        };
        check_range(range_start, range_end)?;
        self.note_unresolved(component);

        let Some(written) = TemporalValue::from_property(rid_prop, self.registry)? else {
            return Err(RfcError::ValidationError(format!(
                "RECURRENCE-ID is not a DATE or DATE-TIME: {}",
                rid_prop.raw_value
            )));
        };
        let (recurrence_id, master_duration) =
            match component.uid().and_then(|uid| self.masters.get(uid)) {
                Some(master) => (
                    conform(&written, &master.start, self.timezone),
                    Some(master.duration),
                ),
                None => (written, None),
            };

        let start = match component.get_property(names::DTSTART) {
            Some(prop) => TemporalValue::from_property(prop, self.registry)?
                .unwrap_or_else(|| recurrence_id.clone()),
            None => recurrence_id.clone(),
        };
        let duration = match explicit_duration(component, &start, self.registry, self.timezone)? {
            Some(duration) => duration,
            None => master_duration.unwrap_or_else(|| default_duration(&start)),
        };
        let end = shift(&start, duration)?;
        let key = self.key_for(&recurrence_id);

        if rid_prop
            .get_param_value(param_names::RANGE)
            .is_some_and(|range| range.eq_ignore_ascii_case(THIS_AND_FUTURE))
        {
            let offset = start.to_instant(self.timezone) - recurrence_id.to_instant(self.timezone);
            self.shift_following(component.uid(), key.0, offset, duration, range_start, range_end)?;
        }

        if intersects(
            start.to_instant(self.timezone),
            end.to_instant(self.timezone),
            range_start,
            range_end,
        ) {
            let instance = Instance {
                start: self.present(start),
                end: self.present(end),
                is_override: true,
                recurrence_id: self.present(recurrence_id),
            };
            tracing::trace!(key = %key.1, "Override applied");
            self.store(key, instance);
        } else if self.evict(&key).is_some() {
            tracing::debug!(key = %key.1, "Override moved occurrence out of range");
        }

        Ok(())
    }

    /// ## Summary
    /// Adds a mixed set of components sharing a UID: masters first, then overrides.
    ///
    /// ## Errors
    /// Returns the first error from [`Self::add_component`] or [`Self::add_override`].
    pub fn add_components<'c, I>(
        &mut self,
        components: I,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> RfcResult<()>
    where
        I: IntoIterator<Item = &'c Component>,
    {
        let (overrides, masters): (Vec<&Component>, Vec<&Component>) =
            components.into_iter().partition(|c| c.is_override());

        for master in masters {
            self.add_component(master, range_start, range_end)?;
        }
        for component in overrides {
            self.add_override(component, range_start, range_end)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterates `(key, instance)` pairs in instant order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.instances
            .iter()
            .map(|((_, key), instance)| (key.as_str(), instance))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Instance> {
        let instant = self.index.get(key)?;
        self.instances.get(&(*instant, key.to_string()))
    }

    fn remember(
        &mut self,
        master: &Component,
        start: TemporalValue,
        duration: TimeDelta,
        recurrence: Option<RecurrenceSet>,
    ) {
        if let Some(uid) = master.uid() {
            self.masters.insert(
                uid.to_string(),
                Master {
                    start,
                    duration,
                    recurrence,
                },
            );
        }
    }

    /// Records each TZID on `component` that the registry cannot resolve.
    fn note_unresolved(&mut self, component: &Component) {
        let tzids = component
            .properties
            .iter()
            .filter_map(|prop| prop.get_param_value(param_names::TZID));
        for tzid in tzids {
            if let Err(e) = self.registry.resolve(tzid)
                && !self.warnings.contains(&e)
            {
                self.warnings.push(e);
            }
        }
    }

    fn store(&mut self, key: Key, instance: Instance) {
        self.index.insert(key.1.clone(), key.0);
        self.instances.insert(key, instance);
    }

    fn evict(&mut self, key: &Key) -> Option<Instance> {
        self.index.remove(&key.1);
        self.instances.remove(key)
    }

    fn read_start(&self, component: &Component) -> RfcResult<Option<TemporalValue>> {
        let Some(prop) = component
            .get_property(names::DTSTART)
            .or_else(|| component.get_property(names::DUE))
        else {
            return Ok(None);
        };
        Ok(TemporalValue::from_property(prop, self.registry)?)
    }

    fn key_for(&self, value: &TemporalValue) -> Key {
        let instant = value.to_instant(self.timezone);
        let key = match value {
            TemporalValue::DateOnly(_) => value.to_string(),
            TemporalValue::Floating(_) if self.timezone.is_none() => value.to_string(),
            _ => TemporalValue::Utc(instant).to_string(),
        };
        (instant, key)
    }

    fn present(&self, value: TemporalValue) -> TemporalValue {
        if self.utc {
            value.to_utc(self.timezone)
        } else {
            value
        }
    }

    fn insert_plain(
        &mut self,
        recurrence_id: TemporalValue,
        start: TemporalValue,
        end: TemporalValue,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) {
        if !intersects(
            start.to_instant(self.timezone),
            end.to_instant(self.timezone),
            range_start,
            range_end,
        ) {
            return;
        }

        let key = self.key_for(&recurrence_id);
        if self.instances.get(&key).is_some_and(|existing| existing.is_override) {
            return;
        }

        let instance = Instance {
            start: self.present(start),
            end: self.present(end),
            is_override: false,
            recurrence_id: self.present(recurrence_id),
        };
        self.store(key, instance);
    }

    /// ## Summary
    /// Moves the plain occurrences after `pivot` by `offset`, giving them `duration`.
    ///
    /// The master is expanded again over the range widened by the offset, so
    /// occurrences that the move brings into the range are found too.
    ///
    /// ## Errors
    /// Propagates rule and date errors from the master's recurrence set.
    fn shift_following(
        &mut self,
        uid: Option<&str>,
        pivot: DateTime<Utc>,
        offset: TimeDelta,
        duration: TimeDelta,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> RfcResult<()> {
        let occurrences = {
            let Some(master) = uid.and_then(|uid| self.masters.get(uid)) else {
                return Ok(());
            };
            let Some(recurrence) = &master.recurrence else {
                return Ok(());
            };
            let reach = offset.abs();
            let window_start = range_start
                .checked_sub_signed(reach + master.duration.abs())
                .unwrap_or(range_start);
            let window_end = range_end.checked_add_signed(reach).unwrap_or(range_end);
            recurrence.occurrences(window_start, window_end, self.timezone, &self.options)?
        };

        for occurrence in occurrences {
            let key = self.key_for(&occurrence.start);
            if key.0 <= pivot || self.instances.get(&key).is_some_and(|i| i.is_override) {
                continue;
            }
            self.evict(&key);

            let start = shift(&occurrence.start, offset)?;
            let end = shift(&start, duration)?;
            if intersects(
                start.to_instant(self.timezone),
                end.to_instant(self.timezone),
                range_start,
                range_end,
            ) {
                let instance = Instance {
                    start: self.present(start),
                    end: self.present(end),
                    is_override: false,
                    recurrence_id: self.present(occurrence.start),
                };
                self.store(key, instance);
            }
        }
        Ok(())
    }
}

fn check_range(range_start: DateTime<Utc>, range_end: DateTime<Utc>) -> RfcResult<()> {
    if range_start > range_end {
        return Err(RfcError::ValidationError(format!(
            "range start {range_start} is after range end {range_end}"
        )));
    }
    Ok(())
}

fn shift(value: &TemporalValue, delta: TimeDelta) -> RfcResult<TemporalValue> {
    value
        .checked_add(delta)
        .ok_or_else(|| ConversionError::InvalidDateTime(format!("{value} + {delta}")).into())
}

/// ## Summary
/// Rewrites a RECURRENCE-ID in the form of its master's DTSTART.
///
/// A floating value is read in the master's zone. A UTC or zoned value on a
/// floating master becomes the master's wall clock, read through
/// `floating_zone` (UTC when none). A date-only master takes the date.
fn conform(
    rid: &TemporalValue,
    master_start: &TemporalValue,
    floating_zone: Option<Tz>,
) -> TemporalValue {
    match (master_start, rid) {
        (TemporalValue::DateOnly(_), _) => TemporalValue::DateOnly(rid.wall_clock().date()),
        (_, TemporalValue::DateOnly(_)) => rid.clone(),
        (_, TemporalValue::Floating(wall)) => master_start.with_wall_clock(*wall),
        (TemporalValue::Floating(_), _) => master_start.with_wall_clock(
            master_start.wall_clock_of(rid.to_instant(floating_zone), floating_zone),
        ),
        _ => rid.clone(),
    }
}

/// One day for dates, zero for date-times.
pub(crate) fn default_duration(start: &TemporalValue) -> TimeDelta {
    if start.is_date() {
        TimeDelta::days(1)
    } else {
        TimeDelta::zero()
    }
}

/// ## Summary
/// Returns the length given by DTEND, DURATION or DUE, in that order.
///
/// Two values without a zone are compared by wall clock so that whole-day
/// spans stay whole days.
///
/// ## Errors
/// Propagates malformed end values.
pub(crate) fn explicit_duration(
    component: &Component,
    start: &TemporalValue,
    registry: &TimeZoneRegistry,
    floating_zone: Option<Tz>,
) -> RfcResult<Option<TimeDelta>> {
    let span = |end: TemporalValue| {
        if start.is_floating() && end.is_floating() {
            end.wall_clock() - start.wall_clock()
        } else {
            end.to_instant(floating_zone) - start.to_instant(floating_zone)
        }
    };

    if let Some(prop) = component.get_property(names::DTEND)
        && let Some(end) = TemporalValue::from_property(prop, registry)?
    {
        return Ok(Some(span(end)));
    }
    if let Some(duration) = component
        .get_property(names::DURATION)
        .and_then(|prop| prop.value.as_duration())
    {
        return Ok(Some(duration.to_chrono()));
    }
    if component.has_property(names::DTSTART)
        && let Some(prop) = component.get_property(names::DUE)
        && let Some(due) = TemporalValue::from_property(prop, registry)?
    {
        return Ok(Some(span(due)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::parse::parse;
    use chrono::TimeZone;

    const FLOATING_DAILY: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:floating-daily\r\n\
DTSTART:20060102T140000\r\n\
DTEND:20060102T150000\r\n\
RRULE:FREQ=DAILY;COUNT=5\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:floating-daily\r\n\
RECURRENCE-ID:20060104T140000\r\n\
DTSTART:20060104T160000\r\n\
DTEND:20060104T170000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:floating-daily\r\n\
RECURRENCE-ID:20060105T140000\r\n\
DTSTART:20060105T160000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn calendar_events(text: &str) -> Vec<Component> {
        parse(text).unwrap().events().into_iter().cloned().collect()
    }

    fn summary(list: &InstanceList<'_>) -> Vec<(String, String, String, bool)> {
        list.iter()
            .map(|(key, i)| (key.to_string(), i.start.to_string(), i.end.to_string(), i.is_override))
            .collect()
    }

    fn row(key: &str, start: &str, end: &str, is_override: bool) -> (String, String, String, bool) {
        (key.to_string(), start.to_string(), end.to_string(), is_override)
    }

    #[test_log::test]
    fn floating_overrides_replace_occurrences() {
        let events = calendar_events(FLOATING_DAILY);
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 19, 0), utc(2006, 1, 8, 19, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20060102T140000", "20060102T140000", "20060102T150000", false),
                row("20060103T140000", "20060103T140000", "20060103T150000", false),
                row("20060104T140000", "20060104T160000", "20060104T170000", true),
                // no DTEND: the master's one-hour duration applies
                row("20060105T140000", "20060105T160000", "20060105T170000", true),
                row("20060106T140000", "20060106T140000", "20060106T150000", false),
            ]
        );
        assert_eq!(
            list.get("20060104T140000").unwrap().recurrence_id.to_string(),
            "20060104T140000"
        );
        assert!(list.get("20060107T140000").is_none());
    }

    #[test_log::test]
    fn utc_mode_projects_through_timezone() {
        let events = calendar_events(FLOATING_DAILY);
        let mut list = InstanceList::default()
            .with_utc(true)
            .with_timezone(Some(Tz::America__New_York));
        list.add_components(&events, utc(2006, 1, 1, 19, 0), utc(2006, 1, 8, 19, 0))
            .unwrap();

        let keys: Vec<&str> = list.keys().collect();
        assert_eq!(
            keys,
            [
                "20060102T190000Z",
                "20060103T190000Z",
                "20060104T190000Z",
                "20060105T190000Z",
                "20060106T190000Z"
            ]
        );
        let moved = list.get("20060104T190000Z").unwrap();
        assert_eq!(moved.start.to_string(), "20060104T210000Z");
        assert_eq!(moved.end.to_string(), "20060104T220000Z");
    }

    #[test_log::test]
    fn occurrence_in_progress_at_range_start_is_included() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\n\
             DTSTART;TZID=America/Chicago:20070508T031500\r\n\
             DURATION:PT1H\r\nRRULE:FREQ=DAILY\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_component(&events[0], utc(2007, 5, 9, 9, 0), utc(2007, 5, 11, 9, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20070509T081500Z", "20070509T031500", "20070509T041500", false),
                row("20070510T081500Z", "20070510T031500", "20070510T041500", false),
                row("20070511T081500Z", "20070511T031500", "20070511T041500", false),
            ]
        );
    }

    #[test_log::test]
    fn all_day_events_use_date_keys() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:allday\r\n\
             DTSTART;VALUE=DATE:20070101\r\nRRULE:FREQ=DAILY\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_component(&events[0], utc(2007, 1, 1, 9, 0), utc(2007, 1, 3, 9, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20070101", "20070101", "20070102", false),
                row("20070102", "20070102", "20070103", false),
                row("20070103", "20070103", "20070104", false),
            ]
        );
    }

    #[test_log::test]
    fn non_recurring_component_is_a_single_instance() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:single\r\n\
             DTSTART:20060104T140000Z\r\nDTEND:20060104T150000Z\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut inside = InstanceList::default();
        inside
            .add_component(&events[0], utc(2006, 1, 4, 14, 30), utc(2006, 1, 5, 0, 0))
            .unwrap();
        assert_eq!(inside.len(), 1);

        let mut outside = InstanceList::default();
        outside
            .add_component(&events[0], utc(2006, 1, 4, 15, 0), utc(2006, 1, 5, 0, 0))
            .unwrap();
        assert!(outside.is_empty());
    }

    #[test_log::test]
    fn zero_length_instances_match_half_open() {
        assert!(intersects(
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 5, 0, 0)
        ));
        assert!(!intersects(
            utc(2006, 1, 5, 0, 0),
            utc(2006, 1, 5, 0, 0),
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 5, 0, 0)
        ));
        assert!(!intersects(
            utc(2006, 1, 4, 13, 0),
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 4, 14, 0),
            utc(2006, 1, 5, 0, 0)
        ));
    }

    #[test_log::test]
    fn adding_twice_is_idempotent() {
        let events = calendar_events(FLOATING_DAILY);
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 19, 0), utc(2006, 1, 8, 19, 0))
            .unwrap();
        let first = summary(&list);
        list.add_components(&events, utc(2006, 1, 1, 19, 0), utc(2006, 1, 8, 19, 0))
            .unwrap();
        assert_eq!(summary(&list), first);
    }

    #[test_log::test]
    fn override_moved_out_of_range_removes_occurrence() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\n\
             BEGIN:VEVENT\r\nUID:m\r\nDTSTART:20060102T140000Z\r\nDURATION:PT1H\r\n\
             RRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:m\r\nRECURRENCE-ID:20060103T140000Z\r\n\
             DTSTART:20060201T140000Z\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();
        let keys: Vec<&str> = list.keys().collect();
        assert_eq!(keys, ["20060102T140000Z", "20060104T140000Z"]);
    }

    #[test_log::test]
    fn orphan_override_is_included() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:orphan\r\n\
             RECURRENCE-ID:20060103T140000Z\r\nDTSTART:20060103T150000Z\r\n\
             DURATION:PT30M\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_override(&events[0], utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();
        let instance = list.get("20060103T140000Z").unwrap();
        assert!(instance.is_override);
        assert_eq!(instance.end.to_string(), "20060103T153000Z");
    }

    #[test_log::test]
    fn this_and_future_shifts_later_occurrences() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\n\
             BEGIN:VEVENT\r\nUID:f\r\nDTSTART:20060102T140000Z\r\nDURATION:PT1H\r\n\
             RRULE:FREQ=DAILY;COUNT=4\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:f\r\nRECURRENCE-ID;RANGE=THISANDFUTURE:20060103T140000Z\r\n\
             DTSTART:20060103T160000Z\r\nDURATION:PT2H\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20060102T140000Z", "20060102T140000Z", "20060102T150000Z", false),
                row("20060103T140000Z", "20060103T160000Z", "20060103T180000Z", true),
                row("20060104T140000Z", "20060104T160000Z", "20060104T180000Z", false),
                row("20060105T140000Z", "20060105T160000Z", "20060105T180000Z", false),
            ]
        );
    }

    #[test_log::test]
    fn floating_recurrence_id_keys_a_zoned_master() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\n\
             BEGIN:VEVENT\r\nUID:z\r\nDTSTART;TZID=America/Chicago:20070501T101500\r\n\
             DURATION:PT1H\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:z\r\nRECURRENCE-ID:20070502T101500\r\n\
             DTSTART;TZID=America/Chicago:20070502T120000\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2007, 5, 1, 0, 0), utc(2007, 5, 10, 0, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20070501T151500Z", "20070501T101500", "20070501T111500", false),
                row("20070502T151500Z", "20070502T120000", "20070502T130000", true),
                row("20070503T151500Z", "20070503T101500", "20070503T111500", false),
            ]
        );
        let moved = list.get("20070502T151500Z").unwrap();
        assert_eq!(moved.recurrence_id.zone(), Some(Tz::America__Chicago));
    }

    #[test_log::test]
    fn utc_recurrence_id_keys_a_floating_master() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\n\
             BEGIN:VEVENT\r\nUID:f\r\nDTSTART:20060102T140000\r\nDTEND:20060102T150000\r\n\
             RRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:f\r\nRECURRENCE-ID:20060103T140000Z\r\n\
             DTSTART:20060103T160000\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20060102T140000", "20060102T140000", "20060102T150000", false),
                row("20060103T140000", "20060103T160000", "20060103T170000", true),
                row("20060104T140000", "20060104T140000", "20060104T150000", false),
            ]
        );
        assert!(list.get("20060103T140000Z").is_none());
    }

    #[test_log::test]
    fn this_and_future_brings_later_occurrences_into_range() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\n\
             BEGIN:VEVENT\r\nUID:early\r\nDTSTART:20060102T140000Z\r\nDURATION:PT1H\r\n\
             RRULE:FREQ=DAILY;COUNT=5\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:early\r\nRECURRENCE-ID;RANGE=THISANDFUTURE:20060103T140000Z\r\n\
             DTSTART:20060103T100000Z\r\nEND:VEVENT\r\n\
             END:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_components(&events, utc(2006, 1, 1, 0, 0), utc(2006, 1, 5, 13, 0))
            .unwrap();

        assert_eq!(
            summary(&list),
            [
                row("20060102T140000Z", "20060102T140000Z", "20060102T150000Z", false),
                row("20060103T140000Z", "20060103T100000Z", "20060103T110000Z", true),
                row("20060104T140000Z", "20060104T100000Z", "20060104T110000Z", false),
                row("20060105T140000Z", "20060105T100000Z", "20060105T110000Z", false),
            ]
        );
    }

    #[test_log::test]
    fn unknown_tzids_are_reported() {
        let events = calendar_events(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:lost\r\n\
             DTSTART;TZID=Custom/Nowhere:20060102T140000\r\n\
             DTEND;TZID=Custom/Nowhere:20060102T150000\r\n\
             RRULE:FREQ=DAILY;COUNT=2\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        );
        let mut list = InstanceList::default();
        list.add_component(&events[0], utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();
        list.add_component(&events[0], utc(2006, 1, 1, 0, 0), utc(2006, 1, 10, 0, 0))
            .unwrap();

        let keys: Vec<&str> = list.keys().collect();
        assert_eq!(keys, ["20060102T140000", "20060103T140000"]);
        assert_eq!(
            list.warnings(),
            [ConversionError::UnknownTimezone("Custom/Nowhere".to_string())]
        );
        assert!(InstanceList::default().warnings().is_empty());
    }

    #[test_log::test]
    fn invalid_inputs_are_rejected() {
        let events = calendar_events(FLOATING_DAILY);
        let mut list = InstanceList::default();

        let err = list
            .add_component(&events[1], utc(2006, 1, 1, 0, 0), utc(2006, 1, 8, 0, 0))
            .unwrap_err();
        assert!(matches!(err, RfcError::ValidationError(_)));

        let err = list
            .add_override(&events[0], utc(2006, 1, 1, 0, 0), utc(2006, 1, 8, 0, 0))
            .unwrap_err();
        assert!(matches!(err, RfcError::ValidationError(_)));

        let err = list
            .add_component(&events[0], utc(2006, 1, 8, 0, 0), utc(2006, 1, 1, 0, 0))
            .unwrap_err();
        assert!(matches!(err, RfcError::ValidationError(_)));
    }
}
