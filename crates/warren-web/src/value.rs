//! # Property Values
//!
//! Runtime values for record properties: the `Value` enum plus the
//! date/duration scalar types it carries.
//!
//! - `Timestamp` is a UTC instant; localization always produces a copy,
//!   never mutates in place
//! - `Interval` is a signed span with integer-second resolution
//!
//! All arithmetic is integer arithmetic.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::types::WebError;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// A point in time, stored in UTC with second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().naive_utc())
    }

    /// Build from a UTC `chrono` instant.
    #[must_use]
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.naive_utc())
    }

    /// Build from a naive UTC datetime.
    #[must_use]
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    /// The underlying naive UTC datetime.
    #[must_use]
    pub fn naive_utc(self) -> NaiveDateTime {
        self.0
    }

    /// A copy shifted into the given timezone offset (whole hours east of
    /// UTC). The receiver is unchanged.
    #[must_use]
    pub fn localized(self, offset_hours: i32) -> Self {
        Self(self.0 + Duration::hours(i64::from(offset_hours)))
    }

    /// A copy offset by the given interval.
    #[must_use]
    pub fn offset_by(self, interval: Interval) -> Self {
        Self(self.0 + Duration::seconds(interval.seconds()))
    }

    /// The signed interval from `other` to `self`.
    #[must_use]
    pub fn since(self, other: Self) -> Interval {
        Interval::from_seconds((self.0 - other.0).num_seconds())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M"))
    }
}

// =============================================================================
// INTERVAL
// =============================================================================

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
// Calendar-free approximations; duration arithmetic never consults a
// calendar.
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// A signed span of time with second resolution.
///
/// Serialized form: optional sign, then whitespace-separated terms, each
/// either `<n>y|m|w|d` or a clock part `HH:MM[:SS]`. Examples: `2d`,
/// `- 1d 2:30`, `3w 04:00:30`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Interval(i64);

impl Interval {
    /// Build from a signed number of seconds.
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// The signed number of seconds.
    #[must_use]
    pub fn seconds(self) -> i64 {
        self.0
    }

    /// Parse the serialized form. Malformed input is a fatal
    /// `MalformedRequest`, never a silently-defaulted value.
    pub fn parse(raw: &str) -> Result<Self, WebError> {
        let bad = || WebError::MalformedRequest(format!("malformed duration \"{raw}\""));
        let mut s = raw.trim();
        let mut sign = 1i64;
        if let Some(rest) = s.strip_prefix('-') {
            sign = -1;
            s = rest.trim_start();
        } else if let Some(rest) = s.strip_prefix('+') {
            s = rest.trim_start();
        }
        if s.is_empty() {
            return Err(bad());
        }

        let mut total = 0i64;
        for term in s.split_whitespace() {
            if term.contains(':') {
                total += parse_clock(term).ok_or_else(bad)?;
                continue;
            }
            let (digits, unit) = term.split_at(term.len().saturating_sub(1));
            let n: i64 = digits.parse().map_err(|_| bad())?;
            let factor = match unit {
                "y" => YEAR,
                "m" => MONTH,
                "w" => WEEK,
                "d" => DAY,
                _ => return Err(bad()),
            };
            total = total.saturating_add(n.saturating_mul(factor));
        }
        Ok(Self(sign * total))
    }

    /// A rough human-readable rendering relative to "now": `in 2 days`,
    /// `3 hours ago`, `just now`.
    #[must_use]
    pub fn pretty(self) -> String {
        let magnitude = self.0.abs();
        let phrase = if magnitude >= 2 * YEAR {
            format!("{} years", magnitude / YEAR)
        } else if magnitude >= 2 * MONTH {
            format!("{} months", magnitude / MONTH)
        } else if magnitude >= 2 * WEEK {
            format!("{} weeks", magnitude / WEEK)
        } else if magnitude >= 2 * DAY {
            format!("{} days", magnitude / DAY)
        } else if magnitude >= DAY {
            return if self.0 < 0 {
                "yesterday".to_string()
            } else {
                "tomorrow".to_string()
            };
        } else if magnitude >= 2 * HOUR {
            format!("{} hours", magnitude / HOUR)
        } else if magnitude >= HOUR {
            "an hour".to_string()
        } else if magnitude >= 2 * MINUTE {
            format!("{} minutes", magnitude / MINUTE)
        } else {
            return "just now".to_string();
        };
        if self.0 < 0 {
            format!("{phrase} ago")
        } else {
            format!("in {phrase}")
        }
    }
}

fn parse_clock(term: &str) -> Option<i64> {
    let mut parts = term.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    Some(hours * HOUR + minutes * MINUTE + seconds)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0.abs();
        if self.0 < 0 {
            write!(f, "- ")?;
        }
        let days = rest / DAY;
        rest %= DAY;
        if days > 0 {
            write!(f, "{days}d ")?;
        }
        let seconds = rest % MINUTE;
        if seconds > 0 {
            write!(f, "{}:{:02}:{:02}", rest / HOUR, (rest % HOUR) / MINUTE, seconds)
        } else {
            write!(f, "{}:{:02}", rest / HOUR, (rest % HOUR) / MINUTE)
        }
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A raw property value as held by the item store or seeded from a form.
///
/// The `MultiReference` variant always holds an ordered sequence of ids
/// (or tokens tolerated during fail-tolerant resolution) — never an
/// unsplit raw string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Free text.
    Text(String),
    /// Integer number.
    Number(i64),
    /// Yes/no flag.
    Boolean(bool),
    /// Point in time.
    Date(Timestamp),
    /// Signed span of time.
    Duration(Interval),
    /// Write-only secret; the payload is the stored digest, never shown.
    Secret(String),
    /// One foreign id.
    Reference(String),
    /// Many foreign ids, ordered.
    MultiReference(Vec<String>),
}

impl Value {
    /// The unstyled display form, with no permission check and no
    /// escaping. Reference values render as their raw id here; label
    /// resolution is the view layer's concern.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) | Self::Secret(s) | Self::Reference(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => {
                if *b {
                    "Yes".to_string()
                } else {
                    "No".to_string()
                }
            }
            Self::Date(t) => t.to_string(),
            Self::Duration(i) => i.to_string(),
            Self::MultiReference(ids) => ids.join(","),
        }
    }

    /// Deterministic cross-kind comparison, used when sorting ids by a
    /// property value. Same-kind values compare naturally; differing
    /// kinds compare by kind name so the total order stays stable.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b))
            | (Self::Secret(a), Self::Secret(b))
            | (Self::Reference(a), Self::Reference(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Duration(a), Self::Duration(b)) => a.cmp(b),
            (Self::MultiReference(a), Self::MultiReference(b)) => a.cmp(b),
            (a, b) => kind_rank(a).cmp(&kind_rank(b)),
        }
    }
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Text(_) => 0,
        Value::Number(_) => 1,
        Value::Boolean(_) => 2,
        Value::Date(_) => 3,
        Value::Duration(_) => 4,
        Value::Secret(_) => 5,
        Value::Reference(_) => 6,
        Value::MultiReference(_) => 7,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parse_days_and_clock() {
        let i = Interval::parse("1d 2:30").expect("parse");
        assert_eq!(i.seconds(), DAY + 2 * HOUR + 30 * MINUTE);
    }

    #[test]
    fn interval_parse_signed() {
        let i = Interval::parse("-2d").expect("parse");
        assert_eq!(i.seconds(), -2 * DAY);
        let i = Interval::parse("- 1d 0:30").expect("parse");
        assert_eq!(i.seconds(), -(DAY + 30 * MINUTE));
    }

    #[test]
    fn interval_parse_rejects_garbage() {
        assert!(Interval::parse("soon").is_err());
        assert!(Interval::parse("").is_err());
        assert!(Interval::parse("1d 99:99").is_err());
    }

    #[test]
    fn interval_display_round_trips() {
        let i = Interval::parse("3d 4:05").expect("parse");
        assert_eq!(i.to_string(), "3d 4:05");
        let i = Interval::parse("- 0:30").expect("parse");
        assert_eq!(i.to_string(), "- 0:30");
    }

    #[test]
    fn interval_pretty_forms() {
        assert_eq!(Interval::from_seconds(-3 * DAY).pretty(), "3 days ago");
        assert_eq!(Interval::from_seconds(DAY + HOUR).pretty(), "tomorrow");
        assert_eq!(Interval::from_seconds(30).pretty(), "just now");
        assert_eq!(Interval::from_seconds(3 * HOUR).pretty(), "in 3 hours");
    }

    #[test]
    fn timestamp_localized_does_not_mutate() {
        let t = Timestamp::now();
        let shifted = t.localized(10);
        assert_ne!(t, shifted);
        assert_eq!(shifted.naive_utc() - t.naive_utc(), Duration::hours(10));
    }

    #[test]
    fn value_compare_same_and_cross_kind() {
        assert_eq!(
            Value::Number(2).compare(&Value::Number(10)),
            Ordering::Less
        );
        // Cross-kind comparisons are stable, not meaningful.
        assert_eq!(
            Value::Text("z".into()).compare(&Value::Number(1)),
            Ordering::Less
        );
    }
}
