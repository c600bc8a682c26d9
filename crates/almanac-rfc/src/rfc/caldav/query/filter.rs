//! CALDAV:filter tree (RFC 4791 §9.7).
//!
//! Every test listed on a node must pass for the node to match. A node
//! marked not-defined matches only when nothing by that name exists, and
//! its other tests are ignored.

use chrono_tz::Tz;

use super::text_match::TextMatch;
use super::time_range::TimeRange;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::ComponentKind;

/// Builder setters shared by the filter nodes.
macro_rules! setters {
    (not_defined) => {
        #[must_use]
        pub fn not_defined(self) -> Self {
            Self { is_not_defined: true, ..self }
        }
    };
    (time_range) => {
        #[must_use]
        pub fn with_time_range(self, range: TimeRange) -> Self {
            Self { time_range: Some(range), ..self }
        }
    };
    (text_match) => {
        #[must_use]
        pub fn with_text_match(self, text_match: TextMatch) -> Self {
            Self { text_match: Some(text_match), ..self }
        }
    };
    ($($what:ident),+) => {
        $(setters!($what);)+
    };
}

/// A calendar-query filter plus the zone floating times are read in.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFilter {
    /// Applies to the VCALENDAR object itself.
    pub filter: ComponentFilter,
    /// CALDAV:timezone.
    pub timezone: Option<Tz>,
}

impl CalendarFilter {
    #[must_use]
    pub fn new(filter: ComponentFilter) -> Self {
        Self { filter, timezone: None }
    }

    /// A bare VCALENDAR root, which any calendar object matches.
    #[must_use]
    pub fn vcalendar() -> Self {
        Self::new(ComponentFilter::new(ComponentKind::Calendar.as_str()))
    }

    #[must_use]
    pub fn with_comp_filter(mut self, filter: ComponentFilter) -> Self {
        self.filter.comp_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_timezone(self, timezone: Tz) -> Self {
        Self { timezone: Some(timezone), ..self }
    }

    /// ## Summary
    /// A query must be rooted at VCALENDAR.
    ///
    /// ## Errors
    /// [`RfcError::ValidationError`] naming the root that was found instead.
    pub fn validate(&self) -> RfcResult<()> {
        let root = &self.filter.name;
        if ComponentKind::parse(root) == ComponentKind::Calendar {
            return Ok(());
        }
        Err(RfcError::ValidationError(format!("filter root must be VCALENDAR, found {root}")))
    }
}

/// CALDAV:comp-filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRange>,
    pub prop_filters: Vec<PropertyFilter>,
    /// Tested against child components, e.g. VALARM under VEVENT.
    pub comp_filters: Vec<ComponentFilter>,
}

impl ComponentFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    setters!(not_defined, time_range);

    #[must_use]
    pub fn with_prop_filter(mut self, filter: PropertyFilter) -> Self {
        self.prop_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_comp_filter(mut self, filter: ComponentFilter) -> Self {
        self.comp_filters.push(filter);
        self
    }
}

/// CALDAV:prop-filter. The time range only applies to date and date-time values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRange>,
    pub text_match: Option<TextMatch>,
    pub param_filters: Vec<ParamFilter>,
}

impl PropertyFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    setters!(not_defined, time_range, text_match);

    #[must_use]
    pub fn with_param_filter(mut self, filter: ParamFilter) -> Self {
        self.param_filters.push(filter);
        self
    }
}

/// CALDAV:param-filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatch>,
}

impl ParamFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    setters!(not_defined, text_match);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn builders_nest_filters() {
        let filter = CalendarFilter::vcalendar().with_comp_filter(
            ComponentFilter::new("VEVENT").with_prop_filter(
                PropertyFilter::new("DTSTART")
                    .with_param_filter(ParamFilter::new("VALUE").with_text_match(TextMatch::new("DATE"))),
            ),
        );
        assert!(filter.validate().is_ok());
        assert_eq!(filter.filter.comp_filters[0].name, "VEVENT");
        assert_eq!(
            filter.filter.comp_filters[0].prop_filters[0].param_filters[0].name,
            "VALUE"
        );
    }

    #[test_log::test]
    fn root_must_be_vcalendar() {
        let filter = CalendarFilter::new(ComponentFilter::new("VEVENT"));
        assert!(matches!(filter.validate(), Err(RfcError::ValidationError(_))));
        assert!(CalendarFilter::new(ComponentFilter::new("vcalendar")).validate().is_ok());
    }
}
