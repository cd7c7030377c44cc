use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::event::UnknownVariant;

// ============================================================================
// Time Interval & Sort Order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Interval start {from} is after end {to}")]
pub struct InvalidInterval {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Time window with per-bound inclusivity
///
/// Invariant: `from <= to`. Construct through `new` or the named constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    from_inclusive: bool,
    to_inclusive: bool,
}

impl TimeInterval {
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        from_inclusive: bool,
        to_inclusive: bool,
    ) -> Result<Self, InvalidInterval> {
        if from > to {
            return Err(InvalidInterval { from, to });
        }
        Ok(Self {
            from,
            to,
            from_inclusive,
            to_inclusive,
        })
    }

    /// `(from, to]`, the convention used by every update feed
    pub fn open_closed(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, InvalidInterval> {
        Self::new(from, to, false, true)
    }

    /// `[from, to]`
    pub fn closed(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, InvalidInterval> {
        Self::new(from, to, true, true)
    }

    /// `(from, to)`
    pub fn open(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, InvalidInterval> {
        Self::new(from, to, false, false)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn from_inclusive(&self) -> bool {
        self.from_inclusive
    }

    pub fn to_inclusive(&self) -> bool {
        self.to_inclusive
    }

    /// True when no instant can satisfy both bounds
    pub fn is_empty(&self) -> bool {
        self.from == self.to && !(self.from_inclusive && self.to_inclusive)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let above_lower = if self.from_inclusive { at >= self.from } else { at > self.from };
        let below_upper = if self.to_inclusive { at <= self.to } else { at < self.to };
        above_lower && below_upper
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.from_inclusive { '[' } else { '(' },
            self.from.to_rfc3339(),
            self.to.to_rfc3339(),
            if self.to_inclusive { ']' } else { ')' },
        )
    }
}

/// Ordering over `occurred_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Compare two timestamps in this order
    pub fn compare(&self, a: &DateTime<Utc>, b: &DateTime<Utc>) -> Ordering {
        match self {
            SortOrder::Asc => a.cmp(b),
            SortOrder::Desc => b.cmp(a),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}
