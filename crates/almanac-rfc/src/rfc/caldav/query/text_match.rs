//! Text matching with RFC 4790 collations.

use std::fmt;
use std::str::FromStr;

use icu::casemap::CaseMapper;

/// Error type for collation lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollationError {
    /// The requested collation is not supported. A CalDAV server answers
    /// this with the `CALDAV:supported-collation` precondition.
    #[error("Unsupported collation: {0}")]
    Unsupported(String),
}

/// Supported collations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    /// `i;ascii-casemap`: ASCII letters compare without case.
    #[default]
    AsciiCasemap,
    /// `i;unicode-casemap`: Unicode case folding.
    UnicodeCasemap,
    /// `i;octet`: exact, case-sensitive equality.
    Octet,
}

impl Collation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AsciiCasemap => "i;ascii-casemap",
            Self::UnicodeCasemap => "i;unicode-casemap",
            Self::Octet => "i;octet",
        }
    }

    /// ## Summary
    /// Returns whether `text` matches `pattern` under this collation.
    ///
    /// The casemap collations test substring containment; `i;octet` tests
    /// equality.
    #[must_use]
    pub fn matches(self, pattern: &str, text: &str) -> bool {
        match self {
            Self::AsciiCasemap => text
                .to_ascii_uppercase()
                .contains(&pattern.to_ascii_uppercase()),
            Self::UnicodeCasemap => {
                let mapper = CaseMapper::new();
                mapper
                    .fold_string(text)
                    .contains(mapper.fold_string(pattern).as_ref())
            }
            Self::Octet => text == pattern,
        }
    }
}

impl FromStr for Collation {
    type Err = CollationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i;ascii-casemap" => Ok(Self::AsciiCasemap),
            "i;unicode-casemap" => Ok(Self::UnicodeCasemap),
            "i;octet" => Ok(Self::Octet),
            unsupported => Err(CollationError::Unsupported(unsupported.to_owned())),
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text matching criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// The text to match.
    pub value: String,
    pub collation: Collation,
    /// Inverts the result after matching.
    pub negate: bool,
}

impl TextMatch {
    /// Creates a match with the default collation.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            collation: Collation::default(),
            negate: false,
        }
    }

    #[must_use]
    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }

    /// ## Summary
    /// Sets the collation by its registered name.
    ///
    /// ## Errors
    /// Returns `CollationError::Unsupported` for an unknown name.
    pub fn with_collation_name(self, name: &str) -> Result<Self, CollationError> {
        Ok(self.with_collation(name.parse()?))
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Tests `text`, applying negation last.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.collation.matches(&self.value, text) != self.negate
    }
}
