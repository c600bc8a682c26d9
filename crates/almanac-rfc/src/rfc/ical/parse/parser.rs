//! Builds the component tree from content lines.

use base64::{Engine, engine::general_purpose::STANDARD};

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use super::values::{
    parse_boolean, parse_date, parse_datetime, parse_duration, parse_float, parse_integer,
    parse_period, parse_rrule, parse_time, parse_utc_offset, unescape_text,
};
use crate::rfc::ical::core::{Component, ContentLine, ICalendar, Property, Value};

/// Parses an iCalendar document.
///
/// Lines after the closing `END:VCALENDAR` are ignored with a warning.
///
/// ## Errors
/// Returns an error if the document is not a single well-nested VCALENDAR or
/// a property value does not match its type.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<ICalendar> {
    // Open components, innermost last, with the line that opened them.
    let mut open: Vec<(usize, Component)> = Vec::new();
    let mut root = None;
    let mut last_line = 1;

    for (line, text) in split_lines(input) {
        last_line = line;
        if root.is_some() {
            tracing::warn!(line, "Ignoring content after END:VCALENDAR");
            break;
        }

        let content_line = parse_content_line(&text, line)?;
        match content_line.name.as_str() {
            "BEGIN" => {
                if open.is_empty() && !content_line.raw_value.eq_ignore_ascii_case("VCALENDAR") {
                    return Err(ParseError::new(ParseErrorKind::MissingBegin, line, 1)
                        .with_context("expected BEGIN:VCALENDAR"));
                }
                open.push((line, Component::named(&content_line.raw_value)));
            }
            "END" => {
                let Some((_, component)) = open.pop() else {
                    return Err(ParseError::new(ParseErrorKind::MissingBegin, line, 1)
                        .with_context(format!("END:{} without BEGIN", content_line.raw_value)));
                };
                if !component.is_named(&content_line.raw_value) {
                    return Err(ParseError::new(ParseErrorKind::MismatchedComponent, line, 1)
                        .with_context(format!(
                            "expected END:{}, got END:{}",
                            component.name, content_line.raw_value
                        )));
                }
                match open.last_mut() {
                    Some((_, parent)) => parent.children.push(component),
                    None => root = Some(component),
                }
            }
            _ => {
                let Some((_, component)) = open.last_mut() else {
                    return Err(ParseError::new(ParseErrorKind::MissingBegin, line, 1)
                        .with_context("expected BEGIN:VCALENDAR"));
                };
                component.properties.push(property(content_line, line)?);
            }
        }
    }

    if let Some((begin, component)) = open.last() {
        return Err(ParseError::new(ParseErrorKind::MissingEnd, last_line, 1).with_context(
            format!("missing END:{} for BEGIN on line {begin}", component.name),
        ));
    }
    let root = root.ok_or_else(|| ParseError::new(ParseErrorKind::MissingBegin, 1, 1))?;

    tracing::debug!(components = root.children.len(), "Parsed iCalendar document");
    Ok(ICalendar { root })
}

fn property(content_line: ContentLine, line: usize) -> ParseResult<Property> {
    let value = typed_value(&content_line, line)?;
    Ok(Property {
        name: content_line.name,
        params: content_line.params,
        value,
        raw_value: content_line.raw_value,
    })
}

/// RFC 5545 default value type of a property, used when VALUE is absent.
///
/// Date-bearing properties are typed from their text so that a bare
/// `YYYYMMDD` is read as a DATE and `start/end` as a PERIOD.
fn default_type(name: &str, raw: &str) -> &'static str {
    match name {
        "DTSTART" | "DTEND" | "DUE" | "RECURRENCE-ID" | "EXDATE" | "RDATE" => {
            if raw.contains('/') {
                "PERIOD"
            } else if raw.split(',').all(|v| v.trim().len() == 8 && !v.contains('T')) {
                "DATE"
            } else {
                "DATE-TIME"
            }
        }
        "DTSTAMP" | "CREATED" | "LAST-MODIFIED" | "COMPLETED" => "DATE-TIME",
        "DURATION" => "DURATION",
        "TRIGGER" if raw.starts_with(['P', '+', '-']) => "DURATION",
        "TRIGGER" => "DATE-TIME",
        "PERCENT-COMPLETE" | "PRIORITY" | "REPEAT" | "SEQUENCE" => "INTEGER",
        "RRULE" | "EXRULE" => "RECUR",
        "TZOFFSETFROM" | "TZOFFSETTO" => "UTC-OFFSET",
        "URL" | "TZURL" | "SOURCE" => "URI",
        "ATTENDEE" | "ORGANIZER" => "CAL-ADDRESS",
        "FREEBUSY" => "PERIOD",
        _ => "TEXT",
    }
}

/// Comma-separated values collapse to the single variant when there is one.
fn one_or_many<T>(
    raw: &str,
    parse_one: impl Fn(&str) -> ParseResult<T>,
    single: impl FnOnce(T) -> Value,
    many: impl FnOnce(Vec<T>) -> Value,
) -> ParseResult<Value> {
    let mut items = raw
        .split(',')
        .map(|item| parse_one(item.trim()))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(match items.len() {
        1 => items.pop().map_or_else(|| many(Vec::new()), single),
        _ => many(items),
    })
}

fn typed_value(content_line: &ContentLine, line: usize) -> ParseResult<Value> {
    let raw = content_line.raw_value.as_str();
    let tzid = content_line.tzid();
    let value_type = content_line.value_type().map_or_else(
        || default_type(&content_line.name, raw).to_string(),
        str::to_ascii_uppercase,
    );

    Ok(match value_type.as_str() {
        "TEXT" => Value::Text(unescape_text(raw)),
        "DATE-TIME" => one_or_many(
            raw,
            |s| parse_datetime(s, tzid, line, 1),
            Value::DateTime,
            Value::DateTimeList,
        )?,
        "DATE" => one_or_many(raw, |s| parse_date(s, line, 1), Value::Date, Value::DateList)?,
        "PERIOD" => one_or_many(
            raw,
            |s| parse_period(s, tzid, line, 1),
            Value::Period,
            Value::PeriodList,
        )?,
        "DURATION" => Value::Duration(parse_duration(raw, line, 1)?),
        "INTEGER" => Value::Integer(parse_integer(raw, line, 1)?),
        "FLOAT" => Value::Float(parse_float(raw, line, 1)?),
        "BOOLEAN" => Value::Boolean(parse_boolean(raw, line, 1)?),
        "RECUR" => Value::Recur(Box::new(parse_rrule(raw, line, 1)?)),
        "UTC-OFFSET" => Value::UtcOffset(parse_utc_offset(raw, line, 1)?),
        "TIME" => Value::Time(parse_time(raw, line, 1)?),
        "CAL-ADDRESS" => Value::CalAddress(raw.to_string()),
        "URI" => Value::Uri(raw.to_string()),
        "BINARY" => Value::Binary(STANDARD.decode(raw).map_err(|e| {
            ParseError::new(ParseErrorKind::InvalidValue, line, 1)
                .with_context(format!("invalid Base64: {e}"))
        })?),
        _ => Value::Unknown(raw.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{ComponentKind, Frequency};

    /// Joins content lines with CRLF.
    fn ics(lines: &[&str]) -> String {
        let mut text = lines.join("\r\n");
        text.push_str("\r\n");
        text
    }

    #[test_log::test]
    fn calendar_with_one_event() {
        let ical = parse(&ics(&[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//Almanac//Parser Test//EN",
            "BEGIN:VEVENT",
            "UID:dentist-0412",
            "DTSTAMP:20240401T080000Z",
            "DTSTART:20240412T073000Z",
            "DTEND:20240412T081500Z",
            "SUMMARY:Dentist\\; bring forms\\, insurance card",
            "END:VEVENT",
            "END:VCALENDAR",
        ]))
        .unwrap();

        assert_eq!(ical.prodid(), Some("-//Almanac//Parser Test//EN"));
        let events = ical.events();
        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.uid(), Some("dentist-0412"));
        assert_eq!(event.summary(), Some("Dentist; bring forms, insurance card"));
        let end = event.get_property("DTEND").and_then(Property::as_datetime).unwrap();
        assert!(end.is_utc());
        assert_eq!((end.hour, end.minute), (8, 15));
    }

    #[test_log::test]
    fn recurrence_and_nested_alarm() {
        let ical = parse(&ics(&[
            "BEGIN:VCALENDAR",
            "BEGIN:VEVENT",
            "UID:standup",
            "DTSTART;TZID=Europe/Berlin:20240603T093000",
            "RRULE:FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR;UNTIL=20240628T073000Z",
            "BEGIN:VALARM",
            "ACTION:DISPLAY",
            "TRIGGER;RELATED=START:-PT5M",
            "END:VALARM",
            "END:VEVENT",
            "END:VCALENDAR",
        ]))
        .unwrap();
        let event = ical.events()[0];

        let start = event.get_property("DTSTART").and_then(Property::as_datetime).unwrap();
        assert_eq!(start.tzid(), Some("Europe/Berlin"));
        assert_eq!(start.minute, 30);

        let rule = event.get_property("RRULE").and_then(|p| p.value.as_recur()).unwrap();
        assert_eq!(rule.freq, Some(Frequency::Daily));
        assert_eq!(rule.by_day.len(), 5);
        assert!(rule.count.is_none());

        let trigger = event.alarms()[0].get_property("TRIGGER").unwrap();
        assert_eq!(trigger.as_duration().map(|d| d.as_seconds()), Some(-300));
        assert_eq!(trigger.get_param_value("related"), Some("START"));
    }

    #[test_log::test]
    fn date_and_period_lists() {
        let ical = parse(&ics(&[
            "BEGIN:VCALENDAR",
            "BEGIN:VTODO",
            "UID:rent",
            "DTSTART;VALUE=DATE:20240501",
            "RDATE;VALUE=DATE:20240601,20240701",
            "RDATE;VALUE=PERIOD:20240815T090000Z/PT30M",
            "EXDATE:20240601T000000Z",
            "END:VTODO",
            "BEGIN:VFREEBUSY",
            "FREEBUSY;FBTYPE=BUSY:20240501T120000Z/20240501T130000Z,20240502T160000Z/PT1H",
            "END:VFREEBUSY",
            "END:VCALENDAR",
        ]))
        .unwrap();
        let todo = ical.todos()[0];

        assert!(todo.get_property("DTSTART").and_then(Property::as_date).is_some());
        assert_eq!(todo.get_property("EXDATE").unwrap().value.as_datetime_list().len(), 1);
        let rdates: Vec<_> = todo.get_properties("RDATE").map(|p| &p.value).collect();
        assert_eq!(rdates[0].as_date_list().len(), 2);
        assert_eq!(rdates[1].as_period_list()[0].start().hour, 9);

        let busy = ical.root.children_of_kind(ComponentKind::FreeBusy)[0];
        let periods = busy.get_property("FREEBUSY").unwrap().value.as_period_list();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[1].start().hour, 16);
    }

    #[test_log::test]
    fn folding_extensions_and_binary() {
        let ical = parse(&ics(&[
            "BEGIN:VCALENDAR",
            "BEGIN:VJOURNAL",
            "UID:notes",
            "DESCRIPTION:Minutes from the planning session",
            "  covering the Q3 roadmap",
            "X-ALMANAC-COLOR;X-SCHEME=rgb:#3366ff",
            "ATTACH;ENCODING=BASE64;VALUE=BINARY:YWxtYW5hYw==",
            "END:VJOURNAL",
            "END:VCALENDAR",
        ]))
        .unwrap();
        let journal = ical.recurrable_components()[0];

        assert_eq!(
            journal.get_property("DESCRIPTION").and_then(Property::as_text),
            Some("Minutes from the planning session covering the Q3 roadmap")
        );
        assert_eq!(
            journal.get_property("x-almanac-color").and_then(Property::as_text),
            Some("#3366ff")
        );
        assert_eq!(
            journal.get_property("ATTACH").unwrap().value,
            Value::Binary(b"almanac".to_vec())
        );
    }

    #[test_log::test]
    fn structure_errors() {
        assert_eq!(parse("").unwrap_err().kind, ParseErrorKind::MissingBegin);
        assert_eq!(
            parse(&ics(&["PRODID:x"])).unwrap_err().kind,
            ParseErrorKind::MissingBegin
        );

        let err = parse(&ics(&["BEGIN:VCALENDAR", "BEGIN:VTODO", "END:VEVENT"])).unwrap_err();
        assert_eq!((err.kind, err.line), (ParseErrorKind::MismatchedComponent, 3));

        let err = parse(&ics(&["BEGIN:VCALENDAR", "BEGIN:VEVENT", "UID:open"])).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
    }

    #[test_log::test]
    fn value_errors_carry_the_line() {
        let err = parse(&ics(&[
            "BEGIN:VCALENDAR",
            "BEGIN:VEVENT",
            "DTSTART:2024O412T073000Z",
            "END:VEVENT",
            "END:VCALENDAR",
        ]))
        .unwrap_err();
        assert_eq!((err.kind, err.line), (ParseErrorKind::InvalidDate, 3));
    }
}
