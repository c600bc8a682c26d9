//! Typed value parsers (RFC 5545 §3.3).
//!
//! Each parser takes the value text plus the position of the property, so
//! errors point at the offending line.

use std::fmt::Display;
use std::str::FromStr;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{
    Date, DateTime, DateTimeForm, Duration, Frequency, Period, RRule, RRuleUntil, Time, UtcOffset,
    Weekday, WeekdayNum,
};

/// Where a value starts, carried into every error.
#[derive(Clone, Copy)]
struct Pos {
    line: usize,
    col: usize,
}

impl Pos {
    const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    const fn shifted(self, by: usize) -> Self {
        Self { line: self.line, col: self.col + by }
    }

    fn error(self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.col)
    }

    fn error_with(self, kind: ParseErrorKind, context: impl Into<String>) -> ParseError {
        self.error(kind).with_context(context)
    }

    /// Unsigned decimal digits only; `str::parse` alone would accept a sign.
    fn digits<T>(self, text: &str, kind: ParseErrorKind) -> ParseResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.error_with(kind, format!("'{text}' is not numeric")));
        }
        self.number(text, kind)
    }

    fn number<T>(self, text: &str, kind: ParseErrorKind) -> ParseResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        text.parse().map_err(|e: T::Err| self.error_with(kind, e.to_string()))
    }
}

/// Splits `text` into fixed-width fields, `None` if the lengths differ.
fn fields<const N: usize>(text: &str, widths: [usize; N]) -> Option<[&str; N]> {
    if !text.is_ascii() || text.len() != widths.iter().sum::<usize>() {
        return None;
    }
    let mut rest = text;
    let mut out = [""; N];
    for (slot, width) in out.iter_mut().zip(widths) {
        let (head, tail) = rest.split_at(width);
        *slot = head;
        rest = tail;
    }
    Some(out)
}

/// `YYYYMMDD`.
///
/// ## Errors
/// Wrong length, non-digits, or a month or day out of range.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<Date> {
    let at = Pos::new(line, col);
    let kind = ParseErrorKind::InvalidDate;
    let [year, month, day] = fields(s, [4, 2, 2]).ok_or_else(|| at.error(kind))?;

    let date = Date::new(at.digits(year, kind)?, at.digits(month, kind)?, at.digits(day, kind)?);
    if (1..=12).contains(&date.month) && (1..=31).contains(&date.day) {
        Ok(date)
    } else {
        Err(at.error_with(kind, s))
    }
}

/// `HHMMSS[Z]`. A second of 60 is a leap second.
///
/// ## Errors
/// Wrong length, non-digits, or a field out of range.
pub fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<Time> {
    let at = Pos::new(line, col);
    let kind = ParseErrorKind::InvalidTime;
    let (clock, is_utc) = match s.strip_suffix('Z') {
        Some(clock) => (clock, true),
        None => (s, false),
    };
    let [hour, minute, second] = fields(clock, [2, 2, 2]).ok_or_else(|| at.error(kind))?;

    let time = Time {
        hour: at.digits(hour, kind)?,
        minute: at.digits(minute, kind)?,
        second: at.digits(second, kind)?,
        is_utc,
    };
    if time.hour < 24 && time.minute < 60 && time.second <= 60 {
        Ok(time)
    } else {
        Err(at.error_with(kind, s))
    }
}

/// `YYYYMMDDTHHMMSS[Z]`. The `Z` form ignores any TZID.
///
/// ## Errors
/// A missing `T` or an invalid date or time part.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let at = Pos::new(line, col);
    let (date, clock) = s
        .split_once('T')
        .ok_or_else(|| at.error(ParseErrorKind::InvalidDateTime))?;

    let date_part = parse_date(date, line, col)?;
    let time = parse_time(clock, line, at.shifted(date.len() + 1).col)?;

    let form = if time.is_utc {
        DateTimeForm::Utc
    } else if let Some(tzid) = tzid {
        DateTimeForm::Zoned { tzid: tzid.to_string() }
    } else {
        DateTimeForm::Floating
    };
    Ok(DateTime::from_parts(date_part, time, form))
}

/// `(+|-)HHMM[SS]`.
///
/// ## Errors
/// A missing sign or a body that is not four or six digits.
pub fn parse_utc_offset(s: &str, line: usize, col: usize) -> ParseResult<UtcOffset> {
    let at = Pos::new(line, col);
    let kind = ParseErrorKind::InvalidUtcOffset;
    let (negative, body) = if let Some(body) = s.strip_prefix('-') {
        (true, body)
    } else {
        (false, s.strip_prefix('+').ok_or_else(|| at.error(kind))?)
    };

    let [hours, minutes, seconds] = fields(body, [2, 2, 2])
        .or_else(|| fields(body, [2, 2, 0]))
        .ok_or_else(|| at.error(kind))?;
    let seconds: i32 = if seconds.is_empty() { 0 } else { at.digits(seconds, kind)? };
    let total = at.digits::<i32>(hours, kind)? * 3600 + at.digits::<i32>(minutes, kind)? * 60 + seconds;

    Ok(UtcOffset::from_seconds(if negative { -total } else { total }))
}

/// `[+|-]PnW` or `[+|-]P[nD][T[nH][nM][nS]]`.
///
/// ## Errors
/// No designators, a designator in the wrong half, or a trailing number.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<Duration> {
    let at = Pos::new(line, col);
    let kind = ParseErrorKind::InvalidDuration;
    let mut duration = Duration::zero();

    let unsigned = if let Some(rest) = s.strip_prefix('-') {
        duration.negative = true;
        rest
    } else {
        s.strip_prefix('+').unwrap_or(s)
    };
    let body = unsigned.strip_prefix('P').ok_or_else(|| at.error_with(kind, s))?;

    if let Some(weeks) = body.strip_suffix('W') {
        duration.weeks = at.digits(weeks, kind)?;
        return Ok(duration);
    }

    let (date_half, time_half) = match body.split_once('T') {
        Some((date_half, time_half)) => (date_half, Some(time_half)),
        None => (body, None),
    };

    let mut designators = 0;
    for (number, unit) in designated(date_half).ok_or_else(|| at.error_with(kind, s))? {
        match unit {
            'D' => duration.days = at.digits(number, kind)?,
            other => return Err(at.error_with(kind, format!("unexpected designator '{other}' in {s}"))),
        }
        designators += 1;
    }
    for (number, unit) in designated(time_half.unwrap_or_default()).ok_or_else(|| at.error_with(kind, s))? {
        let slot = match unit {
            'H' => &mut duration.hours,
            'M' => &mut duration.minutes,
            'S' => &mut duration.seconds,
            other => return Err(at.error_with(kind, format!("unexpected designator '{other}' in {s}"))),
        };
        *slot = at.digits(number, kind)?;
        designators += 1;
    }

    let empty_time = time_half.is_some_and(str::is_empty);
    if designators == 0 || empty_time {
        return Err(at.error_with(kind, s));
    }
    Ok(duration)
}

/// Splits `1D` or `2H30M` into `(number, designator)` pairs.
/// `None` when a number has no designator after it.
fn designated(text: &str) -> Option<Vec<(&str, char)>> {
    let mut pairs = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if !c.is_ascii_digit() {
            pairs.push((&text[start..i], c));
            start = i + c.len_utf8();
        }
    }
    (start == text.len()).then_some(pairs)
}

/// `start/end` or `start/duration`, both sharing the property's TZID.
///
/// ## Errors
/// A missing `/` or an invalid half.
pub fn parse_period(s: &str, tzid: Option<&str>, line: usize, col: usize) -> ParseResult<Period> {
    let (start, end) = s
        .split_once('/')
        .ok_or_else(|| Pos::new(line, col).error(ParseErrorKind::InvalidPeriod))?;

    let start_at = parse_datetime(start, tzid, line, col)?;
    let end_col = col + start.len() + 1;

    if end.starts_with(['P', '+', '-']) {
        Ok(Period::from_duration(start_at, parse_duration(end, line, end_col)?))
    } else {
        Ok(Period::explicit(start_at, parse_datetime(end, tzid, line, end_col)?))
    }
}

/// A RECUR value. Unknown parts are logged and skipped.
///
/// ## Errors
/// A malformed part, or UNTIL together with COUNT.
pub fn parse_rrule(s: &str, line: usize, col: usize) -> ParseResult<RRule> {
    let at = Pos::new(line, col);
    let mut rule = RRule::new();

    for part in s.split(';').filter(|part| !part.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| at.error_with(ParseErrorKind::InvalidRRule, part))?;
        apply_rule_part(&mut rule, key, value, at)?;
    }

    if rule.until.is_some() && rule.count.is_some() {
        return Err(at.error(ParseErrorKind::UntilCountConflict));
    }
    Ok(rule)
}

fn apply_rule_part(rule: &mut RRule, key: &str, value: &str, at: Pos) -> ParseResult<()> {
    let bad = ParseErrorKind::InvalidRRule;

    match key.to_ascii_uppercase().as_str() {
        "FREQ" => {
            let freq = Frequency::parse(value)
                .ok_or_else(|| at.error_with(ParseErrorKind::InvalidFrequency, value))?;
            rule.freq = Some(freq);
        }
        "INTERVAL" => rule.interval = Some(at.digits(value, bad)?),
        "COUNT" => rule.count = Some(at.digits(value, bad)?),
        "UNTIL" if value.contains('T') => {
            rule.until = Some(RRuleUntil::DateTime(parse_datetime(value, None, at.line, at.col)?));
        }
        "UNTIL" => rule.until = Some(RRuleUntil::Date(parse_date(value, at.line, at.col)?)),
        "WKST" => rule.wkst = Some(weekday(value, at)?),
        "BYDAY" => {
            rule.by_day = value
                .split(',')
                .map(|entry| weekday_num(entry.trim(), at))
                .collect::<ParseResult<_>>()?;
        }
        "BYSECOND" => rule.by_second = number_list(value, at)?,
        "BYMINUTE" => rule.by_minute = number_list(value, at)?,
        "BYHOUR" => rule.by_hour = number_list(value, at)?,
        "BYMONTHDAY" => rule.by_monthday = number_list(value, at)?,
        "BYYEARDAY" => rule.by_yearday = number_list(value, at)?,
        "BYWEEKNO" => rule.by_weekno = number_list(value, at)?,
        "BYMONTH" => rule.by_month = number_list(value, at)?,
        "BYSETPOS" => rule.by_setpos = number_list(value, at)?,
        other => tracing::debug!(part = other, "Ignoring unknown RRULE part"),
    }
    Ok(())
}

/// Comma-separated, possibly signed integers.
fn number_list<T>(text: &str, at: Pos) -> ParseResult<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    text.split(',')
        .map(|item| at.number(item.trim(), ParseErrorKind::InvalidRRule))
        .collect()
}

fn weekday(text: &str, at: Pos) -> ParseResult<Weekday> {
    Weekday::parse(text).ok_or_else(|| at.error_with(ParseErrorKind::InvalidWeekday, text))
}

/// `MO`, `1MO`, `+2TU` or `-1FR`.
fn weekday_num(text: &str, at: Pos) -> ParseResult<WeekdayNum> {
    let split = text
        .len()
        .checked_sub(2)
        .filter(|&i| text.is_char_boundary(i))
        .ok_or_else(|| at.error_with(ParseErrorKind::InvalidWeekday, text))?;
    let (nth, day) = text.split_at(split);

    let ordinal = match nth.trim_start_matches('+') {
        "" => None,
        signed => Some(at.number(signed, ParseErrorKind::InvalidRRule)?),
    };
    Ok(WeekdayNum { ordinal, weekday: weekday(day, at)? })
}

/// Reverses TEXT escaping (RFC 5545 §3.3.11): `\\`, `\,`, `\;` and `\n`/`\N`.
/// Any other backslash sequence is left alone.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('\\') {
        out.push_str(&rest[..i]);
        let mut tail = rest[i + 1..].chars();
        match tail.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(c @ (',' | ';' | '\\')) => out.push(c),
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => out.push('\\'),
        }
        rest = tail.as_str();
    }
    out.push_str(rest);
    out
}

/// `TRUE` or `FALSE`, any case.
///
/// ## Errors
/// Anything else.
pub fn parse_boolean(s: &str, line: usize, col: usize) -> ParseResult<bool> {
    match s.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(Pos::new(line, col).error_with(ParseErrorKind::InvalidBoolean, s)),
    }
}

/// ## Errors
/// Not a 32-bit signed integer.
pub fn parse_integer(s: &str, line: usize, col: usize) -> ParseResult<i32> {
    Pos::new(line, col).number(s, ParseErrorKind::InvalidInteger)
}

/// ## Errors
/// Not a decimal number.
pub fn parse_float(s: &str, line: usize, col: usize) -> ParseResult<f64> {
    Pos::new(line, col).number(s, ParseErrorKind::InvalidFloat)
}
