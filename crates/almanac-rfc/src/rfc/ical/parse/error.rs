pub type ParseResult<T> = Result<T, ParseError>;

/// A syntax error with its 1-based position in the unfolded input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}{}", suffix(.context.as_deref()))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    /// The offending text or a short explanation.
    pub context: Option<String>,
}

fn suffix(context: Option<&str>) -> String {
    context.map_or_else(String::new, |context| format!(": {context}"))
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column, context: None }
    }

    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self { context: Some(context.into()), ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    // Content lines
    #[error("invalid property name")]
    InvalidPropertyName,
    #[error("missing property name")]
    MissingPropertyName,
    #[error("missing colon separator")]
    MissingColon,
    #[error("invalid parameter format")]
    InvalidParameter,
    #[error("unclosed quoted string")]
    UnclosedQuote,

    // Values
    #[error("invalid date format")]
    InvalidDate,
    #[error("invalid time format")]
    InvalidTime,
    #[error("invalid date-time format")]
    InvalidDateTime,
    #[error("invalid duration format")]
    InvalidDuration,
    #[error("invalid period format")]
    InvalidPeriod,
    #[error("invalid recurrence rule")]
    InvalidRRule,
    #[error("invalid frequency")]
    InvalidFrequency,
    #[error("invalid weekday")]
    InvalidWeekday,
    #[error("UNTIL and COUNT are mutually exclusive")]
    UntilCountConflict,
    #[error("invalid UTC offset format")]
    InvalidUtcOffset,
    #[error("invalid boolean value")]
    InvalidBoolean,
    #[error("invalid integer value")]
    InvalidInteger,
    #[error("invalid float value")]
    InvalidFloat,
    #[error("invalid property value")]
    InvalidValue,

    // Structure
    #[error("missing BEGIN line")]
    MissingBegin,
    #[error("missing END line")]
    MissingEnd,
    #[error("mismatched BEGIN/END")]
    MismatchedComponent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_reported() {
        let err = ParseError::new(ParseErrorKind::InvalidDate, 3, 9);
        assert_eq!(err.to_string(), "invalid date format at line 3, column 9");
    }

    #[test]
    fn context_follows_a_colon() {
        let err = ParseError::new(ParseErrorKind::MismatchedComponent, 7, 1)
            .with_context("expected END:VEVENT, got END:VTODO");
        assert_eq!(
            err.to_string(),
            "mismatched BEGIN/END at line 7, column 1: expected END:VEVENT, got END:VTODO"
        );
    }
}
