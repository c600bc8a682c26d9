//! calendar-query filter model and evaluation (RFC 4791 §7.8, §9.7).

mod alarm;
mod evaluator;
mod filter;
mod text_match;
mod time_range;

pub use evaluator::CalendarFilterEvaluator;
pub use filter::{CalendarFilter, ComponentFilter, ParamFilter, PropertyFilter};
pub use text_match::{Collation, CollationError, TextMatch};
pub use time_range::TimeRange;
