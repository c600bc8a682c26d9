//! DURATION values (RFC 5545 §3.3.6).

use std::fmt;

use chrono::TimeDelta;

/// `[+-]P[nW]` or `[+-]P[nD][T[nH][nM][nS]]`.
///
/// There are no month or year designators, so every duration has a fixed
/// length in seconds. A day counts as 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub negative: bool,
    /// Never combined with the other fields.
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Duration {
    #[must_use]
    pub const fn zero() -> Self {
        Self { negative: false, weeks: 0, days: 0, hours: 0, minutes: 0, seconds: 0 }
    }

    #[must_use]
    pub const fn weeks(weeks: u32) -> Self {
        Self { weeks, ..Self::zero() }
    }

    #[must_use]
    pub const fn hours(hours: u32) -> Self {
        Self { hours, ..Self::zero() }
    }

    #[must_use]
    pub const fn minutes(minutes: u32) -> Self {
        Self { minutes, ..Self::zero() }
    }

    #[must_use]
    pub const fn negate(self) -> Self {
        Self { negative: !self.negative, ..self }
    }

    #[must_use]
    pub fn as_seconds(&self) -> i64 {
        let units = [
            (self.weeks, 604_800),
            (self.days, 86_400),
            (self.hours, 3_600),
            (self.minutes, 60),
            (self.seconds, 1),
        ];
        let total: i64 = units.iter().map(|&(count, size)| i64::from(count) * size).sum();
        if self.negative { -total } else { total }
    }

    #[must_use]
    pub fn to_chrono(&self) -> TimeDelta {
        TimeDelta::seconds(self.as_seconds())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.negative { "-P" } else { "P" })?;
        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }

        let clock = [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')];
        let mut wrote_t = false;
        for (count, unit) in clock.into_iter().filter(|&(count, _)| count > 0) {
            if !wrote_t {
                f.write_str("T")?;
                wrote_t = true;
            }
            write!(f, "{count}{unit}")?;
        }

        if self.days == 0 && !wrote_t {
            f.write_str("0D")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_shortest_form() {
        assert_eq!(Duration::weeks(2).to_string(), "P2W");
        assert_eq!(Duration::minutes(15).negate().to_string(), "-PT15M");
        assert_eq!(Duration::zero().to_string(), "P0D");
        let mixed = Duration { days: 1, hours: 2, seconds: 5, ..Duration::zero() };
        assert_eq!(mixed.to_string(), "P1DT2H5S");
    }

    #[test]
    fn signed_length() {
        assert_eq!(Duration::weeks(1).as_seconds(), 604_800);
        assert_eq!(Duration::minutes(15).negate().as_seconds(), -900);
        assert_eq!(Duration::hours(1).to_chrono(), TimeDelta::hours(1));
    }
}
