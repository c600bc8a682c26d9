//! Evaluates a `CalendarFilter` against a parsed calendar.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::alarm::AlarmSchedule;
use super::filter::{CalendarFilter, ComponentFilter, ParamFilter, PropertyFilter};
use super::time_range::TimeRange;
use crate::error::RfcResult;
use crate::rfc::ical::core::{Component, ComponentKind, ICalendar, Property, names};
use crate::rfc::ical::expand::{
    ExpansionOptions, InstanceList, TemporalValue, TimeZoneRegistry, default_duration,
    explicit_duration,
};

/// Per-call state shared by every test in one evaluation.
struct Scope<'c> {
    calendar: &'c ICalendar,
    /// Zone for floating and date values.
    zone: Option<Tz>,
}

/// Matches calendars against calendar-query filters.
///
/// Recurring components match when any of their instances does; time-range
/// tests follow the tables of RFC 4791 §9.9.
#[derive(Debug, Clone, Copy)]
pub struct CalendarFilterEvaluator<'r> {
    registry: &'r TimeZoneRegistry,
    options: ExpansionOptions,
}

impl Default for CalendarFilterEvaluator<'static> {
    fn default() -> Self {
        Self::new(TimeZoneRegistry::global())
    }
}

impl<'r> CalendarFilterEvaluator<'r> {
    #[must_use]
    pub fn new(registry: &'r TimeZoneRegistry) -> Self {
        Self {
            registry,
            options: ExpansionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExpansionOptions) -> Self {
        self.options = options;
        self
    }

    /// ## Summary
    /// Returns whether `calendar` satisfies `filter`.
    ///
    /// Floating values are read in the filter's timezone, falling back to the
    /// registry default and then UTC. A time-range test that hits malformed
    /// data is logged and counts as no match.
    #[must_use]
    #[tracing::instrument(skip_all, fields(root = %filter.filter.name))]
    pub fn evaluate(&self, calendar: &ICalendar, filter: &CalendarFilter) -> bool {
        let scope = Scope {
            calendar,
            zone: filter.timezone.or_else(|| self.registry.default_zone()),
        };
        let matched = self.component_matches(
            std::slice::from_ref(&calendar.root),
            None,
            &filter.filter,
            &scope,
        );
        tracing::debug!(matched, "Evaluated calendar filter");
        matched
    }

    fn component_matches(
        &self,
        candidates: &[Component],
        parent: Option<&Component>,
        filter: &ComponentFilter,
        scope: &Scope<'_>,
    ) -> bool {
        let mut named = candidates.iter().filter(|c| c.is_named(&filter.name));
        if filter.is_not_defined {
            return named.next().is_none();
        }

        named.any(|component| {
            filter.comp_filters.iter().all(|child| {
                self.component_matches(&component.children, Some(component), child, scope)
            }) && filter
                .prop_filters
                .iter()
                .all(|prop_filter| self.property_matches(component, prop_filter, scope))
                && filter.time_range.as_ref().is_none_or(|range| {
                    self.component_in_range(component, parent, range, scope)
                })
        })
    }

    fn component_in_range(
        &self,
        component: &Component,
        parent: Option<&Component>,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> bool {
        self.try_component_in_range(component, parent, range, scope)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    component = %component.name,
                    uid = component.uid().unwrap_or_default(),
                    error = %e,
                    "Time-range test failed, treating as no match"
                );
                false
            })
    }

    fn try_component_in_range(
        &self,
        component: &Component,
        parent: Option<&Component>,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        if is_recurring_master(component) {
            return Ok(self
                .expand(component, range, TimeDelta::zero(), scope)?
                .is_some_and(|instances| !instances.is_empty()));
        }

        match component.kind {
            Some(ComponentKind::Event) => self.event_in_range(component, range, scope),
            Some(ComponentKind::Todo) => self.todo_in_range(component, range, scope),
            Some(ComponentKind::Journal) => self.journal_in_range(component, range, scope),
            Some(ComponentKind::FreeBusy) => self.freebusy_in_range(component, range, scope),
            Some(ComponentKind::Alarm) => self.alarm_in_range(component, parent, range, scope),
            _ => {
                tracing::debug!(component = %component.name, "No time-range semantics for component");
                Ok(false)
            }
        }
    }

    fn event_in_range(
        &self,
        event: &Component,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        let Some(start) = self.read(event, names::DTSTART)? else {
            return Ok(false);
        };
        let (start, end) = self.occupied(event, &start, scope.zone)?;
        Ok(range.overlaps(start, end))
    }

    fn todo_in_range(
        &self,
        todo: &Component,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        let instant = |name: &str| -> RfcResult<Option<DateTime<Utc>>> {
            Ok(self.read(todo, name)?.map(|value| value.to_instant(scope.zone)))
        };
        let dtstart = instant(names::DTSTART)?;
        let due = instant(names::DUE)?;
        let duration = todo
            .get_property(names::DURATION)
            .and_then(|prop| prop.value.as_duration())
            .map(|duration| duration.to_chrono());
        let (rs, re) = range.bounds();

        let matched = match (dtstart, duration, due) {
            (Some(start), Some(duration), _) => {
                let end = start.checked_add_signed(duration).unwrap_or(start);
                rs <= end && (re > start || re >= end)
            }
            (Some(start), None, Some(due)) => (rs < due || rs <= start) && (re > start || re >= due),
            (Some(start), None, None) => rs <= start && re > start,
            (None, _, Some(due)) => rs < due && re >= due,
            (None, _, None) => match (instant(names::COMPLETED)?, instant(names::CREATED)?) {
                (Some(completed), Some(created)) => {
                    (rs <= created || rs <= completed) && (re >= created || re >= completed)
                }
                (Some(completed), None) => rs <= completed && re >= completed,
                (None, Some(created)) => re > created,
                (None, None) => true,
            },
        };
        Ok(matched)
    }

    fn journal_in_range(
        &self,
        journal: &Component,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        let Some(start) = self.read(journal, names::DTSTART)? else {
            return Ok(false);
        };
        let (start, end) = span(&start, default_duration(&start), scope.zone);
        Ok(range.overlaps(start, end))
    }

    fn freebusy_in_range(
        &self,
        freebusy: &Component,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        let periods: Vec<_> = freebusy
            .get_properties(names::FREEBUSY)
            .flat_map(|prop| prop.value.as_period_list())
            .collect();
        if !periods.is_empty() {
            for period in periods {
                let (start, end) = TemporalValue::period_bounds(period, self.registry)?;
                if range.overlaps(start.to_instant(scope.zone), end.to_instant(scope.zone)) {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        let (Some(start), Some(end)) = (
            self.read(freebusy, names::DTSTART)?,
            self.read(freebusy, names::DTEND)?,
        ) else {
            return Ok(false);
        };
        let (rs, re) = range.bounds();
        Ok(rs <= end.to_instant(scope.zone) && re > start.to_instant(scope.zone))
    }

    fn alarm_in_range(
        &self,
        alarm: &Component,
        parent: Option<&Component>,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        let Some(parent) = parent.filter(|parent| {
            matches!(parent.kind, Some(ComponentKind::Event | ComponentKind::Todo))
        }) else {
            tracing::debug!("VALARM outside VEVENT or VTODO never matches a time range");
            return Ok(false);
        };
        let Some(schedule) = AlarmSchedule::from_component(
            alarm,
            self.registry,
            scope.zone,
            self.options.max_instances,
        )?
        else {
            return Ok(false);
        };

        if let Some(times) = schedule.absolute_fire_times() {
            return Ok(times.into_iter().any(|time| range.contains(time)));
        }

        let fires_in_range = |start: DateTime<Utc>, end: DateTime<Utc>| {
            schedule
                .fire_times(start, end)
                .into_iter()
                .any(|time| range.contains(time))
        };

        if is_recurring_master(parent) {
            let margin = schedule.extent() + TimeDelta::days(1);
            let Some(instances) = self.expand(parent, range, margin, scope)? else {
                return Ok(false);
            };
            return Ok(instances.instances().any(|instance| {
                fires_in_range(
                    instance.start.to_instant(scope.zone),
                    instance.end.to_instant(scope.zone),
                )
            }));
        }

        let Some(start) = self.read_start(parent)? else {
            return Ok(false);
        };
        let (start, end) = self.occupied(parent, &start, scope.zone)?;
        Ok(fires_in_range(start, end))
    }

    /// Expands a recurring master together with its overrides.
    ///
    /// The window is the range widened by `margin`. An open start begins a
    /// day before the first occurrence; an open end stops at the horizon.
    fn expand(
        &self,
        master: &Component,
        range: &TimeRange,
        margin: TimeDelta,
        scope: &Scope<'_>,
    ) -> RfcResult<Option<InstanceList<'r>>> {
        let Some(first) = self.read_start(master)? else {
            return Ok(None);
        };
        let first = first.to_instant(scope.zone);

        let window_start = match range.start {
            Some(start) => earlier(start, margin),
            None => earlier(first, margin + TimeDelta::days(1)),
        };
        let window_end = match range.end {
            Some(end) => later(end, margin),
            None => later(window_start.max(first), self.options.recurrence_horizon),
        };

        let uid = master.uid();
        let overrides = scope.calendar.root.children.iter().filter(|candidate| {
            candidate.is_override()
                && candidate.is_named(&master.name)
                && uid.is_some_and(|uid| candidate.uid() == Some(uid))
        });

        let mut instances = InstanceList::new(self.registry)
            .with_timezone(scope.zone)
            .with_options(self.options);
        instances.add_components(std::iter::once(master).chain(overrides), window_start, window_end)?;
        tracing::trace!(count = instances.len(), "Expanded for time-range test");
        Ok(Some(instances))
    }

    /// Returns the instants a component occupies from `start`.
    fn occupied(
        &self,
        component: &Component,
        start: &TemporalValue,
        zone: Option<Tz>,
    ) -> RfcResult<(DateTime<Utc>, DateTime<Utc>)> {
        let duration = explicit_duration(component, start, self.registry, zone)?
            .unwrap_or_else(|| default_duration(start));
        Ok(span(start, duration, zone))
    }

    fn read(&self, component: &Component, name: &str) -> RfcResult<Option<TemporalValue>> {
        match component.get_property(name) {
            Some(prop) => Ok(TemporalValue::from_property(prop, self.registry)?),
            None => Ok(None),
        }
    }

    fn read_start(&self, component: &Component) -> RfcResult<Option<TemporalValue>> {
        match self.read(component, names::DTSTART)? {
            Some(start) => Ok(Some(start)),
            None => self.read(component, names::DUE),
        }
    }

    fn property_matches(
        &self,
        component: &Component,
        filter: &PropertyFilter,
        scope: &Scope<'_>,
    ) -> bool {
        let mut props = component.get_properties(&filter.name);
        if filter.is_not_defined {
            return props.next().is_none();
        }

        props.any(|prop| {
            filter
                .text_match
                .as_ref()
                .is_none_or(|text_match| text_match.matches(prop.match_text()))
                && filter
                    .param_filters
                    .iter()
                    .all(|param_filter| param_matches(prop, param_filter))
                && filter
                    .time_range
                    .as_ref()
                    .is_none_or(|range| self.property_in_range(prop, range, scope))
        })
    }

    fn property_in_range(&self, prop: &Property, range: &TimeRange, scope: &Scope<'_>) -> bool {
        self.try_property_in_range(prop, range, scope)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    property = %prop.name,
                    error = %e,
                    "Property time-range test failed, treating as no match"
                );
                false
            })
    }

    /// Periods match by overlap, dates by the day they cover and date-times
    /// as points. Values of any other type never match.
    fn try_property_in_range(
        &self,
        prop: &Property,
        range: &TimeRange,
        scope: &Scope<'_>,
    ) -> RfcResult<bool> {
        for period in prop.value.as_period_list() {
            let (start, end) = TemporalValue::period_bounds(period, self.registry)?;
            if range.overlaps(start.to_instant(scope.zone), end.to_instant(scope.zone)) {
                return Ok(true);
            }
        }
        for value in TemporalValue::list_from_property(prop, self.registry)? {
            let (start, end) = span(&value, default_duration(&value), scope.zone);
            if range.overlaps(start, end) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn param_matches(prop: &Property, filter: &ParamFilter) -> bool {
    let param = prop.get_param(&filter.name);
    if filter.is_not_defined {
        return param.is_none();
    }
    param.is_some_and(|param| {
        filter
            .text_match
            .as_ref()
            .is_none_or(|text_match| param.values.iter().any(|value| text_match.matches(value)))
    })
}

fn is_recurring_master(component: &Component) -> bool {
    component.kind.is_some_and(ComponentKind::is_recurrable)
        && component.is_recurring()
        && !component.is_override()
}

/// Start and end instants of `value` lasting `duration`.
fn span(
    value: &TemporalValue,
    duration: TimeDelta,
    zone: Option<Tz>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = value.to_instant(zone);
    let end = value
        .checked_add(duration)
        .map_or(start, |end| end.to_instant(zone));
    (start, end.max(start))
}

fn earlier(instant: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    instant
        .checked_sub_signed(delta)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn later(instant: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    instant
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
