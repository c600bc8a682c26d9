//! Components and the VCALENDAR document (RFC 5545 §3.4-3.6).

use std::fmt;

use super::{Property, names};

/// Known component names. Anything else (X- and IANA extensions) is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Todo,
    Journal,
    FreeBusy,
    Timezone,
    /// Nested in VEVENT or VTODO.
    Alarm,
    /// VTIMEZONE observance.
    Standard,
    /// VTIMEZONE observance.
    Daylight,
    Unknown,
}

const KIND_NAMES: [(ComponentKind, &str); 9] = [
    (ComponentKind::Calendar, "VCALENDAR"),
    (ComponentKind::Event, "VEVENT"),
    (ComponentKind::Todo, "VTODO"),
    (ComponentKind::Journal, "VJOURNAL"),
    (ComponentKind::FreeBusy, "VFREEBUSY"),
    (ComponentKind::Timezone, "VTIMEZONE"),
    (ComponentKind::Alarm, "VALARM"),
    (ComponentKind::Standard, "STANDARD"),
    (ComponentKind::Daylight, "DAYLIGHT"),
];

impl ComponentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("X-UNKNOWN", |(_, name)| name)
    }

    /// Looks a name up, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        KIND_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map_or(Self::Unknown, |(kind, _)| *kind)
    }

    /// VEVENT, VTODO and VJOURNAL may carry RRULE/RDATE and overrides.
    #[must_use]
    pub const fn is_recurrable(self) -> bool {
        matches!(self, Self::Event | Self::Todo | Self::Journal)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component with its properties and sub-components, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Component {
    pub kind: Option<ComponentKind>,
    /// Upper-cased name as written, kept for extension components.
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Component>,
}

impl Component {
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self::named(kind.as_str())
    }

    /// Creates a component from the name on its BEGIN line.
    #[must_use]
    pub fn named(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        Self {
            kind: Some(ComponentKind::parse(&name)),
            name,
            ..Self::default()
        }
    }

    /// Component names compare without case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.get_properties(name).next()
    }

    /// Every property called `name`, e.g. repeated EXDATE lines.
    pub fn get_properties<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Property> + use<'a, 'n> {
        self.properties
            .iter()
            .filter(move |prop| prop.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.get_property(names::UID).and_then(Property::as_text)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.get_property(names::SUMMARY).and_then(Property::as_text)
    }

    #[must_use]
    pub fn recurrence_id(&self) -> Option<&Property> {
        self.get_property(names::RECURRENCE_ID)
    }

    /// An override replaces one occurrence of a master with the same UID.
    #[must_use]
    pub fn is_override(&self) -> bool {
        self.recurrence_id().is_some()
    }

    /// Whether RRULE or RDATE define further occurrences.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.has_property(names::RRULE) || self.has_property(names::RDATE)
    }

    #[must_use]
    pub fn children_of_kind(&self, kind: ComponentKind) -> Vec<&Component> {
        self.children
            .iter()
            .filter(|child| child.kind == Some(kind))
            .collect()
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<&Component> {
        self.children_of_kind(ComponentKind::Alarm)
    }
}

/// A parsed iCalendar object.
#[derive(Debug, Clone, PartialEq)]
pub struct ICalendar {
    /// The VCALENDAR component.
    pub root: Component,
}

impl ICalendar {
    #[must_use]
    pub fn prodid(&self) -> Option<&str> {
        self.root.get_property(names::PRODID)?.as_text()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root.get_property(names::VERSION)?.as_text()
    }

    #[must_use]
    pub fn events(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Event)
    }

    #[must_use]
    pub fn todos(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Todo)
    }

    /// Top-level VEVENT, VTODO and VJOURNAL components, masters and overrides alike.
    #[must_use]
    pub fn recurrable_components(&self) -> Vec<&Component> {
        self.root
            .children
            .iter()
            .filter(|child| child.kind.is_some_and(ComponentKind::is_recurrable))
            .collect()
    }

    /// Distinct UIDs of top-level components, sorted.
    #[must_use]
    pub fn uids(&self) -> Vec<&str> {
        let mut uids: Vec<&str> = self.root.children.iter().filter_map(Component::uid).collect();
        uids.sort_unstable();
        uids.dedup();
        uids
    }
}
