//! VALARM fire times (RFC 5545 §3.6.6).

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::error::RfcResult;
use crate::rfc::ical::core::{Component, TriggerRelated, Value, names, param_names};
use crate::rfc::ical::expand::{TemporalValue, TimeZoneRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Relative {
        offset: TimeDelta,
        related: TriggerRelated,
    },
    Absolute(DateTime<Utc>),
}

/// When an alarm fires, relative to its parent component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AlarmSchedule {
    trigger: Trigger,
    /// Number of extra firings after the first.
    repeat: u16,
    interval: TimeDelta,
}

impl AlarmSchedule {
    /// ## Summary
    /// Reads TRIGGER, REPEAT and DURATION from an alarm.
    ///
    /// Returns `None` when TRIGGER is missing or unusable. REPEAT only takes
    /// effect together with DURATION and is capped at `max_repeat`.
    ///
    /// ## Errors
    /// Propagates an impossible absolute trigger date.
    pub(crate) fn from_component(
        alarm: &Component,
        registry: &TimeZoneRegistry,
        floating_zone: Option<Tz>,
        max_repeat: u16,
    ) -> RfcResult<Option<Self>> {
        let Some(prop) = alarm.get_property(names::TRIGGER) else {
            return Ok(None);
        };

        let trigger = match &prop.value {
            Value::Duration(duration) => Trigger::Relative {
                offset: duration.to_chrono(),
                related: prop
                    .get_param_value(param_names::RELATED)
                    .map_or(TriggerRelated::Start, TriggerRelated::parse),
            },
            Value::DateTime(dt) => Trigger::Absolute(
                TemporalValue::from_datetime(dt, registry)?.to_instant(floating_zone),
            ),
            _ => {
                tracing::debug!(raw = %prop.raw_value, "Ignoring unusable TRIGGER");
                return Ok(None);
            }
        };

        let interval = alarm
            .get_property(names::DURATION)
            .and_then(|p| p.value.as_duration())
            .map(|d| d.to_chrono());
        let repeat = alarm
            .get_property(names::REPEAT)
            .and_then(|p| p.value.as_integer())
            .unwrap_or(0);

        let (repeat, interval) = match interval {
            Some(interval) if repeat > 0 && interval > TimeDelta::zero() => (
                u16::try_from(repeat).unwrap_or(u16::MAX).min(max_repeat),
                interval,
            ),
            _ => (0, TimeDelta::zero()),
        };

        Ok(Some(Self {
            trigger,
            repeat,
            interval,
        }))
    }

    /// Returns the fire times when they do not depend on the parent.
    pub(crate) fn absolute_fire_times(&self) -> Option<Vec<DateTime<Utc>>> {
        match self.trigger {
            Trigger::Absolute(first) => Some(self.repeat_from(first)),
            Trigger::Relative { .. } => None,
        }
    }

    /// Returns the fire times for a parent occurrence spanning `[start, end]`.
    pub(crate) fn fire_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let first = match self.trigger {
            Trigger::Absolute(first) => Some(first),
            Trigger::Relative { offset, related } => {
                let base = match related {
                    TriggerRelated::Start => start,
                    TriggerRelated::End => end,
                };
                base.checked_add_signed(offset)
            }
        };
        first.map(|first| self.repeat_from(first)).unwrap_or_default()
    }

    /// Returns how far the fire times can reach from their base instant.
    pub(crate) fn extent(&self) -> TimeDelta {
        let offset = match self.trigger {
            Trigger::Relative { offset, .. } => offset.abs(),
            Trigger::Absolute(_) => TimeDelta::zero(),
        };
        offset + self.interval * i32::from(self.repeat)
    }

    fn repeat_from(&self, first: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut times = vec![first];
        let mut current = first;
        for _ in 0..self.repeat {
            let Some(next) = current.checked_add_signed(self.interval) else {
                break;
            };
            times.push(next);
            current = next;
        }
        times
    }
}
