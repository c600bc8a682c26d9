use thiserror::Error;

use crate::rfc::caldav::query::CollationError;
use crate::rfc::ical::expand::ConversionError;
use crate::rfc::ical::parse::ParseError;

/// Parsing, expansion and query errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Ical(#[from] ParseError),

    #[error("Recurrence rule error: {0}")]
    RRule(#[from] rrule::RRuleError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Collation(#[from] CollationError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
