//! Content lines (RFC 5545 §3.1): unfolding and `name;params:value` splitting.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{ContentLine, Parameter};

/// Joins folded lines. Bare LF line endings come out as CRLF.
#[must_use]
pub fn unfold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, physical) in input.split('\n').enumerate() {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        match physical.strip_prefix([' ', '\t']) {
            Some(continued) if i > 0 => out.push_str(continued),
            _ => {
                if i > 0 {
                    out.push_str("\r\n");
                }
                out.push_str(physical);
            }
        }
    }
    out
}

/// Logical lines paired with the 1-based physical line they start on.
///
/// Blank lines are dropped. A line that starts with whitespace, or has no
/// colon at all, continues the one before it.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (number, physical) in (1..).zip(input.lines()) {
        let physical = physical.trim_end_matches('\r');
        if physical.is_empty() {
            continue;
        }

        let continued = physical
            .strip_prefix([' ', '\t'])
            .or_else(|| (!physical.contains(':')).then_some(physical));
        match (continued, lines.last_mut()) {
            (Some(rest), Some((_, previous))) => previous.push_str(rest),
            (Some(rest), None) => lines.push((number, rest.to_owned())),
            (None, _) => lines.push((number, physical.to_owned())),
        }
    }

    lines
}

/// Byte cursor over one logical line.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes a run of name characters (letters, digits and `-`).
    fn name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '-') {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    /// Error at the current position, reported 1-based.
    fn fail(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.pos + 1)
    }

    fn fail_at_end(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.text.len())
    }

    /// One parameter value, quoted or bare. Quoted values decode RFC 6868
    /// caret escapes.
    fn param_value(&mut self) -> ParseResult<String> {
        let start = self.pos;
        if self.peek() != Some('"') {
            while self.peek().is_some_and(|c| !matches!(c, ',' | ';' | ':')) {
                self.bump();
            }
            return Ok(self.text[start..self.pos].to_owned());
        }

        self.bump();
        let mut value = String::new();
        while let Some(c) = self.bump() {
            match c {
                '"' => return Ok(value),
                '^' => match self.peek() {
                    Some('^') => {
                        self.bump();
                        value.push('^');
                    }
                    Some('n') => {
                        self.bump();
                        value.push('\n');
                    }
                    Some('\'') => {
                        self.bump();
                        value.push('"');
                    }
                    _ => value.push('^'),
                },
                other => value.push(other),
            }
        }
        Err(ParseError::new(ParseErrorKind::UnclosedQuote, self.line, start + 1))
    }

    /// `NAME=value[,value]` after a `;`. Leaves the cursor on the delimiter.
    fn parameter(&mut self) -> ParseResult<Parameter> {
        let name = self.name();
        if name.is_empty() || self.bump() != Some('=') {
            return Err(self.fail(ParseErrorKind::InvalidParameter));
        }

        let mut values = vec![self.param_value()?];
        while self.peek() == Some(',') {
            self.bump();
            values.push(self.param_value()?);
        }
        Ok(Parameter::with_values(name, values))
    }
}

/// Splits `name *(";" param) ":" value`.
///
/// ## Errors
/// A bad property or parameter name, an unclosed quote, or no colon.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let mut cursor = Cursor { text: line, pos: 0, line: line_num };

    let name = cursor.name().to_ascii_uppercase();
    match cursor.peek() {
        None => return Err(cursor.fail_at_end(ParseErrorKind::MissingColon)),
        Some(';' | ':') if name.is_empty() => {
            return Err(cursor.fail(ParseErrorKind::MissingPropertyName));
        }
        Some(';' | ':') => {}
        Some(_) => return Err(cursor.fail(ParseErrorKind::InvalidPropertyName)),
    }

    let mut params = Vec::new();
    loop {
        match cursor.bump() {
            Some(':') => break,
            Some(';') => params.push(cursor.parameter()?),
            Some(other) => {
                cursor.pos -= other.len_utf8();
                return Err(cursor
                    .fail(ParseErrorKind::InvalidParameter)
                    .with_context(format!("unexpected character '{other}'")));
            }
            None => return Err(cursor.fail_at_end(ParseErrorKind::MissingColon)),
        }
    }

    Ok(ContentLine {
        name,
        params,
        raw_value: line[cursor.pos..].to_owned(),
    })
}
