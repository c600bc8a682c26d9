use almanac_core::config::Settings;
use almanac_rfc::rfc::ical::core::{Component, ICalendar, names};
use almanac_rfc::rfc::ical::expand::{ExpansionOptions, InstanceList, TimeZoneRegistry};
use almanac_test::{load_fixture, range};
use chrono_tz::America;

fn expand(
    calendar: &ICalendar,
    mut instances: InstanceList<'_>,
    start: &str,
    end: &str,
) -> anyhow::Result<Vec<(String, String, String, bool)>> {
    let (range_start, range_end) = range(start, end)?.bounds();
    instances.add_components(calendar.recurrable_components(), range_start, range_end)?;
    Ok(instances
        .iter()
        .map(|(key, instance)| {
            (
                key.to_string(),
                instance.start.to_string(),
                instance.end.to_string(),
                instance.is_override,
            )
        })
        .collect())
}

fn keys(rows: &[(String, String, String, bool)]) -> Vec<&str> {
    rows.iter().map(|(key, ..)| key.as_str()).collect()
}

#[test_log::test]
fn floating_recurrence_with_overrides() -> anyhow::Result<()> {
    let calendar = load_fixture("floating_recurring.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20060101T000000Z",
        "20060201T000000Z",
    )?;

    assert_eq!(
        keys(&rows),
        [
            "20060102T140000",
            "20060103T140000",
            "20060104T140000",
            "20060105T140000",
            "20060106T140000",
        ]
    );
    assert_eq!(
        rows[0],
        (
            "20060102T140000".to_string(),
            "20060102T140000".to_string(),
            "20060102T150000".to_string(),
            false
        )
    );
    assert_eq!(
        rows[2],
        (
            "20060104T140000".to_string(),
            "20060104T160000".to_string(),
            "20060104T170000".to_string(),
            true
        )
    );
    // No DTEND on the override: the master's hour carries over.
    assert_eq!(
        rows[3],
        (
            "20060105T140000".to_string(),
            "20060105T160000".to_string(),
            "20060105T170000".to_string(),
            true
        )
    );
    Ok(())
}

#[test_log::test]
fn floating_recurrence_in_utc_mode() -> anyhow::Result<()> {
    let calendar = load_fixture("floating_recurring.ics")?;
    let list = InstanceList::default()
        .with_utc(true)
        .with_timezone(Some(America::New_York));
    let rows = expand(&calendar, list, "20060101T000000Z", "20060201T000000Z")?;

    assert_eq!(
        keys(&rows),
        [
            "20060102T190000Z",
            "20060103T190000Z",
            "20060104T190000Z",
            "20060105T190000Z",
            "20060106T190000Z",
        ]
    );
    assert_eq!(rows[0].1, "20060102T190000Z");
    assert_eq!(rows[2].1, "20060104T210000Z");
    assert_eq!(rows[2].2, "20060104T220000Z");
    assert!(rows[2].3);
    Ok(())
}

#[test_log::test]
fn floating_recurrence_follows_list_timezone() -> anyhow::Result<()> {
    let calendar = load_fixture("floating_recurring.ics")?;
    let list = InstanceList::default().with_timezone(Some(America::Los_Angeles));
    let rows = expand(&calendar, list, "20060102T220000Z", "20060108T000000Z")?;

    assert_eq!(
        keys(&rows),
        [
            "20060102T220000Z",
            "20060103T220000Z",
            "20060104T220000Z",
            "20060105T220000Z",
            "20060106T220000Z",
        ]
    );
    // Without UTC mode the instance keeps its floating form.
    assert_eq!(rows[0].1, "20060102T140000");
    Ok(())
}

#[test_log::test]
fn zoned_daily_recurrence() -> anyhow::Result<()> {
    let calendar = load_fixture("zoned_daily.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070509T090000Z",
        "20070511T090000Z",
    )?;

    assert_eq!(
        keys(&rows),
        ["20070509T081500Z", "20070510T081500Z", "20070511T081500Z"]
    );
    assert_eq!(rows[0].1, "20070509T031500");
    assert_eq!(rows[0].2, "20070509T041500");
    Ok(())
}

#[test_log::test]
fn exdates_in_every_form() -> anyhow::Result<()> {
    for fixture in ["exdate_zoned.ics", "exdate_utc.ics", "exdate_floating.ics"] {
        let calendar = load_fixture(fixture)?;
        let rows = expand(
            &calendar,
            InstanceList::default(),
            "20070509T090000Z",
            "20070609T090000Z",
        )?;
        assert_eq!(
            keys(&rows),
            ["20070529T101500Z", "20070605T101500Z"],
            "{fixture}"
        );
    }
    Ok(())
}

#[test_log::test]
fn override_reinstates_an_excluded_occurrence() -> anyhow::Result<()> {
    let calendar = load_fixture("exdate_override.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070509T090000Z",
        "20070609T090000Z",
    )?;

    assert_eq!(
        keys(&rows),
        ["20070522T101500Z", "20070529T101500Z", "20070605T101500Z"]
    );
    assert_eq!(
        rows[0],
        (
            "20070522T101500Z".to_string(),
            "20070522T080000".to_string(),
            "20070522T090000".to_string(),
            true
        )
    );
    Ok(())
}

#[test_log::test]
fn single_exdate_removes_exactly_one_occurrence() -> anyhow::Result<()> {
    let calendar = load_fixture("exdate_utc.ics")?;
    let master = calendar.events()[0];
    let (range_start, range_end) = range("20070509T090000Z", "20070609T090000Z")?.bounds();

    let keys_of = |component: &Component| -> anyhow::Result<Vec<String>> {
        let mut list = InstanceList::default();
        list.add_component(component, range_start, range_end)?;
        Ok(list.keys().map(str::to_string).collect())
    };

    let mut unrestricted = master.clone();
    unrestricted.properties.retain(|prop| prop.name != names::EXDATE);
    let mut one_exdate = unrestricted.clone();
    one_exdate
        .properties
        .extend(master.get_properties(names::EXDATE).take(1).cloned());

    let all = keys_of(&unrestricted)?;
    let fewer = keys_of(&one_exdate)?;
    assert_eq!(fewer.len() + 1, all.len());
    let missing: Vec<&String> = all.iter().filter(|key| !fewer.contains(key)).collect();
    assert_eq!(missing, ["20070515T101500Z"]);
    Ok(())
}

#[test_log::test]
fn rdates_including_a_period() -> anyhow::Result<()> {
    let calendar = load_fixture("rdate.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070501T000000Z",
        "20070601T000000Z",
    )?;

    assert_eq!(
        keys(&rows),
        [
            "20070501T151500Z",
            "20070508T151500Z",
            "20070510T151500Z",
            "20070512T151500Z",
            "20070515T151500Z",
            "20070517T101500Z",
            "20070522T151500Z",
        ]
    );
    let period = &rows[5];
    assert_eq!(period.1, "20070517T101500Z");
    assert_eq!(period.2, "20070517T131500Z");
    Ok(())
}

#[test_log::test]
fn exrule_removes_alternate_weeks() -> anyhow::Result<()> {
    let calendar = load_fixture("exrule.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070501T000000Z",
        "20070601T000000Z",
    )?;

    assert_eq!(keys(&rows), ["20070515T151500Z", "20070529T151500Z"]);
    Ok(())
}

#[test_log::test]
fn all_day_recurrence() -> anyhow::Result<()> {
    let calendar = load_fixture("allday_recurring.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070101T090000Z",
        "20070103T090000Z",
    )?;

    assert_eq!(keys(&rows), ["20070101", "20070102", "20070103"]);
    assert_eq!(rows[0].1, "20070101");
    assert_eq!(rows[0].2, "20070102");
    Ok(())
}

#[test_log::test]
fn instance_started_before_range() -> anyhow::Result<()> {
    let calendar = load_fixture("long_weekly.ics")?;
    let rows = expand(
        &calendar,
        InstanceList::default(),
        "20070529T110000Z",
        "20070530T051500Z",
    )?;

    assert_eq!(keys(&rows), ["20070529T101500Z"]);
    assert_eq!(rows[0].1, "20070529T051500");
    assert_eq!(rows[0].2, "20070529T071500");
    Ok(())
}

#[test_log::test]
fn configured_limits_and_default_zone() -> anyhow::Result<()> {
    let settings = Settings::from_toml(
        r#"
[expansion]
max_instances = 3

[timezone]
default_tzid = "US/Eastern"
"#,
    )?;
    let registry = TimeZoneRegistry::from_config(&settings.timezone)?;
    let calendar = load_fixture("zoned_daily.ics")?;

    let list = InstanceList::new(&registry).with_options(ExpansionOptions::from(&settings.expansion));
    assert_eq!(list.timezone(), Some(chrono_tz::America::New_York));

    let rows = expand(&calendar, list, "20070505T000000Z", "20070601T000000Z")?;
    assert_eq!(
        keys(&rows),
        ["20070505T081500Z", "20070506T081500Z", "20070507T081500Z"]
    );
    Ok(())
}
