use std::path::Path;

use almanac_core::config::Settings;
use almanac_rfc::rfc::caldav::query::{
    CalendarFilter, CalendarFilterEvaluator, ComponentFilter, PropertyFilter, TextMatch, TimeRange,
};
use almanac_rfc::rfc::ical::core::{ICalendar, names};
use almanac_rfc::rfc::ical::expand::{ExpansionOptions, InstanceList, TimeZoneRegistry};
use almanac_rfc::rfc::ical::parse::parse;
use anyhow::Context;
use chrono_tz::Tz;

pub struct MatchArgs {
    pub component: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
    pub collation: Option<String>,
    pub tz: Option<String>,
}

/// Prints `uid key start end [override]` for every instance in the range.
///
/// TZIDs that could not be resolved are reported on stderr.
pub fn expand(
    config: &Settings,
    file: &Path,
    start: &str,
    end: &str,
    utc: bool,
    tz: Option<&str>,
) -> anyhow::Result<()> {
    let registry = TimeZoneRegistry::from_config(&config.timezone)?;
    let calendar = read_calendar(file)?;
    let (range_start, range_end) = TimeRange::parse(Some(start), Some(end))?.bounds();
    let timezone = resolve_zone(&registry, tz)?.or_else(|| registry.default_zone());

    for uid in calendar.uids() {
        let components = calendar
            .recurrable_components()
            .into_iter()
            .filter(|component| component.uid() == Some(uid));

        let mut instances = InstanceList::new(&registry)
            .with_utc(utc)
            .with_timezone(timezone)
            .with_options(ExpansionOptions::from(&config.expansion));
        instances.add_components(components, range_start, range_end)?;
        for warning in instances.warnings() {
            eprintln!("{uid} warning: {warning}");
        }

        for (key, instance) in instances.iter() {
            let marker = if instance.is_override { " override" } else { "" };
            println!("{uid} {key} {} {}{marker}", instance.start, instance.end);
        }
    }
    Ok(())
}

/// Prints `match` or `no match` for a VCALENDAR > component filter.
pub fn matches(config: &Settings, file: &Path, args: &MatchArgs) -> anyhow::Result<()> {
    let registry = TimeZoneRegistry::from_config(&config.timezone)?;
    let calendar = read_calendar(file)?;

    let mut component = ComponentFilter::new(args.component.to_ascii_uppercase());
    if args.start.is_some() || args.end.is_some() {
        component =
            component.with_time_range(TimeRange::parse(args.start.as_deref(), args.end.as_deref())?);
    }
    if let Some(summary) = &args.summary {
        let mut text_match = TextMatch::new(summary.as_str());
        if let Some(collation) = &args.collation {
            text_match = text_match.with_collation_name(collation)?;
        }
        component =
            component.with_prop_filter(PropertyFilter::new(names::SUMMARY).with_text_match(text_match));
    }

    let mut filter = CalendarFilter::vcalendar().with_comp_filter(component);
    if let Some(zone) = resolve_zone(&registry, args.tz.as_deref())? {
        filter = filter.with_timezone(zone);
    }
    filter.validate()?;

    let evaluator =
        CalendarFilterEvaluator::new(&registry).with_options(ExpansionOptions::from(&config.expansion));
    if evaluator.evaluate(&calendar, &filter) {
        println!("match");
    } else {
        println!("no match");
    }
    Ok(())
}

fn read_calendar(file: &Path) -> anyhow::Result<ICalendar> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let calendar =
        parse(&text).with_context(|| format!("Failed to parse {}", file.display()))?;
    tracing::debug!(
        file = %file.display(),
        prodid = calendar.prodid().unwrap_or_default(),
        version = calendar.version().unwrap_or_default(),
        uids = calendar.uids().len(),
        "Calendar loaded"
    );
    Ok(calendar)
}

fn resolve_zone(registry: &TimeZoneRegistry, tzid: Option<&str>) -> anyhow::Result<Option<Tz>> {
    tzid.map(|tzid| registry.resolve(tzid)).transpose().map_err(Into::into)
}
