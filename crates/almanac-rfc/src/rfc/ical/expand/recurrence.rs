//! Recurrence set expansion (RRULE, RDATE, EXDATE, EXRULE) using the `rrule` crate.
//!
//! Rules are expanded in the wall-clock space of DTSTART: the wall time is
//! handed to `rrule` as if it were UTC and every result is mapped back
//! through [`TemporalValue::with_wall_clock`]. A zoned daily 10:00 event
//! therefore stays at 10:00 local time across DST transitions.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use rrule::Unvalidated;

use almanac_core::config::ExpansionConfig;

use super::temporal::TemporalValue;
use super::timezone::TimeZoneRegistry;
use crate::error::RfcResult;
use crate::rfc::ical::core::{Component, RRule, RRuleUntil, names};

const WALL_FORMAT: &str = "%Y%m%dT%H%M%S";

const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// Limits applied while expanding recurrence sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Upper bound on occurrences produced by one rule.
    pub max_instances: u16,
    /// How far past "now" an open-ended range is expanded.
    pub recurrence_horizon: TimeDelta,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_instances: 1000,
            recurrence_horizon: TimeDelta::days(3650),
        }
    }
}

impl From<&ExpansionConfig> for ExpansionOptions {
    fn from(config: &ExpansionConfig) -> Self {
        Self {
            max_instances: config.max_instances,
            recurrence_horizon: TimeDelta::days(i64::from(config.recurrence_horizon_days)),
        }
    }
}

/// One member of a recurrence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: TemporalValue,
    /// Explicit end, present only for RDATE periods.
    pub end: Option<TemporalValue>,
}

#[derive(Debug, Clone)]
struct Rule {
    rule: RRule,
    until: Option<TemporalValue>,
}

/// The recurrence properties of a master component, resolved against a
/// timezone registry.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    dtstart: TemporalValue,
    rules: Vec<Rule>,
    exrules: Vec<Rule>,
    rdates: Vec<Occurrence>,
    exdates: Vec<TemporalValue>,
}

impl RecurrenceSet {
    /// ## Summary
    /// Collects RRULE, EXRULE, RDATE and EXDATE from `component`.
    ///
    /// ## Errors
    /// Returns an error if a recurrence date or UNTIL bound is not a real date.
    pub fn from_component(
        component: &Component,
        dtstart: TemporalValue,
        registry: &TimeZoneRegistry,
    ) -> RfcResult<Self> {
        let rules = collect_rules(component, names::RRULE, registry)?;
        let exrules = collect_rules(component, names::EXRULE, registry)?;

        let mut rdates = Vec::new();
        for prop in component.get_properties(names::RDATE) {
            for start in TemporalValue::list_from_property(prop, registry)? {
                rdates.push(Occurrence { start, end: None });
            }
            for period in prop.value.as_period_list() {
                let (start, end) = TemporalValue::period_bounds(period, registry)?;
                rdates.push(Occurrence {
                    start,
                    end: Some(end),
                });
            }
        }

        let mut exdates = Vec::new();
        for prop in component.get_properties(names::EXDATE) {
            exdates.extend(TemporalValue::list_from_property(prop, registry)?);
        }

        Ok(Self {
            dtstart,
            rules,
            exrules,
            rdates,
            exdates,
        })
    }

    #[must_use]
    pub fn dtstart(&self) -> &TemporalValue {
        &self.dtstart
    }

    /// ## Summary
    /// Returns the members of the set in instant order.
    ///
    /// RRULE members are limited to those starting near `[window_start,
    /// window_end]`; DTSTART and RDATE members are always returned. EXDATE
    /// and EXRULE removals are already applied. Floating and date values are
    /// read in `floating_zone` when DTSTART has no zone of its own.
    ///
    /// ## Errors
    /// Returns an error if the `rrule` crate rejects a rule.
    pub fn occurrences(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        floating_zone: Option<Tz>,
        options: &ExpansionOptions,
    ) -> RfcResult<Vec<Occurrence>> {
        let after = self.wall_bound(window_start, floating_zone, -TimeDelta::days(1));
        let before = self.wall_bound(window_end, floating_zone, TimeDelta::days(1));

        let mut candidates = vec![Occurrence {
            start: self.dtstart.clone(),
            end: None,
        }];
        for rule in &self.rules {
            for wall in self.expand_rule(rule, after, before, floating_zone, options.max_instances)? {
                candidates.push(Occurrence {
                    start: self.dtstart.with_wall_clock(wall),
                    end: None,
                });
            }
        }
        candidates.extend(self.rdates.iter().cloned());

        let zone = self.dtstart.zone().or(floating_zone);
        let mut excluded: HashSet<DateTime<Utc>> = self
            .exdates
            .iter()
            .filter(|exdate| !exdate.is_date())
            .map(|exdate| exdate.to_instant(zone))
            .collect();
        let excluded_dates: HashSet<NaiveDate> = self
            .exdates
            .iter()
            .filter_map(|exdate| match exdate {
                TemporalValue::DateOnly(date) => Some(*date),
                _ => None,
            })
            .collect();
        for rule in &self.exrules {
            for wall in self.expand_rule(rule, after, before, floating_zone, options.max_instances)? {
                excluded.insert(self.dtstart.with_wall_clock(wall).to_instant(floating_zone));
            }
        }

        let mut seen = HashSet::new();
        let mut occurrences: Vec<(DateTime<Utc>, Occurrence)> = candidates
            .into_iter()
            .filter_map(|occurrence| {
                let instant = occurrence.start.to_instant(floating_zone);
                let date = occurrence.start.wall_clock().date();
                let keep = !excluded.contains(&instant)
                    && !excluded_dates.contains(&date)
                    && seen.insert(instant);
                keep.then_some((instant, occurrence))
            })
            .collect();
        occurrences.sort_by_key(|(instant, _)| *instant);

        tracing::trace!(
            count = occurrences.len(),
            exdates = self.exdates.len(),
            "Recurrence set expanded"
        );

        Ok(occurrences.into_iter().map(|(_, occurrence)| occurrence).collect())
    }

    fn wall_bound(&self, instant: DateTime<Utc>, floating_zone: Option<Tz>, margin: TimeDelta) -> NaiveDateTime {
        let wall = self.dtstart.wall_clock_of(instant, floating_zone);
        wall.checked_add_signed(margin).unwrap_or(wall)
    }

    /// Expands one rule between two wall-clock bounds.
    fn expand_rule(
        &self,
        rule: &Rule,
        after: NaiveDateTime,
        before: NaiveDateTime,
        floating_zone: Option<Tz>,
        limit: u16,
    ) -> RfcResult<Vec<NaiveDateTime>> {
        let start_wall = self.dtstart.wall_clock();
        let mut text = rule.rule.with_until(None).to_string();

        if let Some(until) = &rule.until {
            let until_wall = match until {
                TemporalValue::DateOnly(date) => date.and_time(END_OF_DAY),
                TemporalValue::Floating(wall) => *wall,
                TemporalValue::Utc(_) | TemporalValue::Zoned(..) => self
                    .dtstart
                    .wall_clock_of(until.to_instant(None), floating_zone),
            };
            if until_wall < start_wall {
                tracing::debug!(rule = %rule.rule, "UNTIL precedes DTSTART, rule is empty");
                return Ok(Vec::new());
            }
            text = format!("{text};UNTIL={}Z", until_wall.format(WALL_FORMAT));
        }

        let utc = rrule::Tz::UTC;
        let set = text
            .parse::<rrule::RRule<Unvalidated>>()?
            .build(start_wall.and_utc().with_timezone(&utc))?
            .after(after.and_utc().with_timezone(&utc))
            .before(before.and_utc().with_timezone(&utc));

        let result = set.all(limit);
        if result.limited {
            tracing::warn!(
                rule = %rule.rule,
                max_instances = limit,
                "Recurrence expansion hit the instance limit"
            );
        }

        Ok(result.dates.iter().map(DateTime::naive_utc).collect())
    }
}

fn collect_rules(
    component: &Component,
    name: &str,
    registry: &TimeZoneRegistry,
) -> RfcResult<Vec<Rule>> {
    component
        .get_properties(name)
        .filter_map(|prop| prop.value.as_recur())
        .map(|rule| {
            let until = match &rule.until {
                None => None,
                Some(RRuleUntil::Date(date)) => Some(TemporalValue::from_date(date)?),
                Some(RRuleUntil::DateTime(dt)) => Some(TemporalValue::from_datetime(dt, registry)?),
            };
            Ok(Rule {
                rule: rule.clone(),
                until,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::parse::parse;
    use chrono::TimeZone;

    fn master(body: &str) -> Component {
        let text = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\nBEGIN:VEVENT\r\nUID:r1\r\n{body}END:VEVENT\r\nEND:VCALENDAR\r\n"
        );
        let ical = parse(&text).unwrap();
        ical.events()[0].clone()
    }

    fn expand(component: &Component, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
        let registry = TimeZoneRegistry::global();
        let dtstart = TemporalValue::from_property(
            component.get_property(names::DTSTART).unwrap(),
            registry,
        )
        .unwrap()
        .unwrap();
        RecurrenceSet::from_component(component, dtstart, registry)
            .unwrap()
            .occurrences(start, end, None, &ExpansionOptions::default())
            .unwrap()
            .into_iter()
            .map(|occurrence| occurrence.start.to_string())
            .collect()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test_log::test]
    fn options_follow_config() {
        let options = ExpansionOptions::from(&ExpansionConfig {
            max_instances: 25,
            recurrence_horizon_days: 30,
        });
        assert_eq!(options.max_instances, 25);
        assert_eq!(options.recurrence_horizon, TimeDelta::days(30));
    }

    #[test_log::test]
    fn zoned_rule_keeps_local_time_across_dst() {
        let event = master(
            "DTSTART;TZID=America/Chicago:20070306T100000\r\nRRULE:FREQ=WEEKLY;COUNT=3\r\n",
        );
        let starts = expand(&event, utc(2007, 3, 1, 0), utc(2007, 4, 1, 0));
        assert_eq!(starts, ["20070306T100000", "20070313T100000", "20070320T100000"]);

        let component = event;
        let registry = TimeZoneRegistry::global();
        let dtstart = TemporalValue::from_property(
            component.get_property(names::DTSTART).unwrap(),
            registry,
        )
        .unwrap()
        .unwrap();
        let instants: Vec<String> = RecurrenceSet::from_component(&component, dtstart, registry)
            .unwrap()
            .occurrences(utc(2007, 3, 1, 0), utc(2007, 4, 1, 0), None, &ExpansionOptions::default())
            .unwrap()
            .iter()
            .map(|occurrence| occurrence.start.to_utc(None).to_string())
            .collect();
        assert_eq!(
            instants,
            ["20070306T160000Z", "20070313T150000Z", "20070320T150000Z"]
        );
    }

    #[test_log::test]
    fn exdates_match_in_every_form() {
        let event = master(
            "DTSTART;TZID=America/Chicago:20070501T051500\r\n\
             RRULE:FREQ=WEEKLY;COUNT=6\r\n\
             EXDATE;TZID=America/Chicago:20070508T051500\r\n\
             EXDATE:20070515T101500Z\r\n\
             EXDATE:20070522T051500\r\n\
             EXDATE;VALUE=DATE:20070529\r\n",
        );
        let starts = expand(&event, utc(2007, 5, 1, 0), utc(2007, 7, 1, 0));
        assert_eq!(starts, ["20070501T051500", "20070605T051500"]);
    }

    #[test_log::test]
    fn rdates_add_dates_and_periods() {
        let event = master(
            "DTSTART;TZID=America/Chicago:20070515T051500\r\n\
             RRULE:FREQ=WEEKLY;COUNT=2\r\n\
             RDATE;TZID=America/Chicago:20070516T051500\r\n\
             RDATE;VALUE=PERIOD:20070517T101500Z/PT3H\r\n",
        );
        let registry = TimeZoneRegistry::global();
        let dtstart = TemporalValue::from_property(
            event.get_property(names::DTSTART).unwrap(),
            registry,
        )
        .unwrap()
        .unwrap();
        let occurrences = RecurrenceSet::from_component(&event, dtstart, registry)
            .unwrap()
            .occurrences(utc(2007, 5, 1, 0), utc(2007, 6, 1, 0), None, &ExpansionOptions::default())
            .unwrap();

        let starts: Vec<String> = occurrences.iter().map(|o| o.start.to_string()).collect();
        assert_eq!(
            starts,
            ["20070515T051500", "20070516T051500", "20070517T101500Z", "20070522T051500"]
        );
        assert_eq!(
            occurrences[2].end.as_ref().map(ToString::to_string).as_deref(),
            Some("20070517T131500Z")
        );
    }

    #[test_log::test]
    fn exrule_removes_occurrences() {
        let event = master(
            "DTSTART:20070515T101500Z\r\n\
             RRULE:FREQ=WEEKLY;COUNT=4\r\n\
             EXRULE:FREQ=WEEKLY;INTERVAL=2;COUNT=2;BYDAY=TU\r\n",
        );
        let starts = expand(&event, utc(2007, 5, 1, 0), utc(2007, 7, 1, 0));
        assert_eq!(starts, ["20070522T101500Z", "20070605T101500Z"]);
    }

    #[test_log::test]
    fn date_until_is_inclusive() {
        let event = master("DTSTART;VALUE=DATE:20070101\r\nRRULE:FREQ=DAILY;UNTIL=20070103\r\n");
        let starts = expand(&event, utc(2006, 12, 1, 0), utc(2007, 2, 1, 0));
        assert_eq!(starts, ["20070101", "20070102", "20070103"]);
    }

    #[test_log::test]
    fn until_before_dtstart_leaves_only_dtstart() {
        let event = master("DTSTART:20070110T090000Z\r\nRRULE:FREQ=DAILY;UNTIL=20070101T000000Z\r\n");
        let starts = expand(&event, utc(2007, 1, 1, 0), utc(2007, 2, 1, 0));
        assert_eq!(starts, ["20070110T090000Z"]);
    }

    #[test_log::test]
    fn window_limits_unbounded_rules() {
        let event = master("DTSTART:20000101T090000Z\r\nRRULE:FREQ=DAILY\r\n");
        let starts = expand(&event, utc(2020, 6, 10, 0), utc(2020, 6, 12, 0));
        assert!(starts.contains(&"20200610T090000Z".to_string()));
        assert!(starts.contains(&"20200611T090000Z".to_string()));
        assert!(!starts.iter().any(|s| s.starts_with("2021")));
    }

    #[test_log::test]
    fn instance_limit_caps_expansion() {
        let event = master("DTSTART:20070101T090000Z\r\nRRULE:FREQ=HOURLY\r\n");
        let registry = TimeZoneRegistry::global();
        let dtstart = TemporalValue::from_property(
            event.get_property(names::DTSTART).unwrap(),
            registry,
        )
        .unwrap()
        .unwrap();
        let options = ExpansionOptions {
            max_instances: 5,
            ..ExpansionOptions::default()
        };
        let occurrences = RecurrenceSet::from_component(&event, dtstart, registry)
            .unwrap()
            .occurrences(utc(2007, 1, 1, 0), utc(2007, 2, 1, 0), None, &options)
            .unwrap();
        assert_eq!(occurrences.len(), 5);
    }
}
