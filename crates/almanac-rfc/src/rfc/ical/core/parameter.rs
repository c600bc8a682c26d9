//! Property parameters (RFC 5545 §3.2).

/// `NAME=value[,value...]` attached to a content line.
///
/// Values are stored unquoted. Multi-valued parameters such as MEMBER keep
/// every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Upper-cased.
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        let mut name = name.into();
        name.make_ascii_uppercase();
        Self { name, values }
    }

    /// First value; single-valued parameters only ever have one.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// Finds a parameter by name, ignoring case.
pub(super) fn find<'a>(params: &'a [Parameter], name: &str) -> Option<&'a Parameter> {
    params.iter().find(|param| param.name.eq_ignore_ascii_case(name))
}

/// RELATED on a relative TRIGGER (RFC 5545 §3.2.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerRelated {
    #[default]
    Start,
    End,
}

impl TriggerRelated {
    /// Only `END` selects the end; any other value falls back to the start.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("END") { Self::End } else { Self::Start }
    }
}

pub mod names {
    pub const RANGE: &str = "RANGE";
    pub const RELATED: &str = "RELATED";
    pub const TZID: &str = "TZID";
    pub const VALUE: &str = "VALUE";
}
