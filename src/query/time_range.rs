use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::ledger::TimeInterval;
use super::clock::Clock;
use super::errors::UpdateQueryError;

// ============================================================================
// TimeRange Resolver
// ============================================================================
//
// Turns optional caller bounds into an open-closed `(from, to]` interval.
// "Now" comes from the injected clock and is read on every call.
//
// ============================================================================

/// Look-back of the global feed when no bounds are supplied
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

const LOCAL_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Earliest instant an entity history can reach
pub fn long_ago() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Latest instant an entity history can reach
pub fn the_future() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2999, 12, 31)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// How missing bounds are filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Missing `to` is now, missing `from` is `to` minus the look-back
    Recent(Duration),
    /// Missing bounds span the store's full retention
    FullRetention,
}

impl WindowPolicy {
    pub fn recent() -> Self {
        WindowPolicy::Recent(Duration::days(DEFAULT_LOOKBACK_DAYS))
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str, param: &'static str) -> Result<DateTime<Utc>, UpdateQueryError> {
    let value = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in LOCAL_DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| UpdateQueryError::InvalidTimestamp {
            param,
            value: raw.to_string(),
        })
}

#[derive(Clone)]
pub struct TimeRangeResolver {
    clock: Arc<dyn Clock>,
}

impl TimeRangeResolver {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn resolve(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        policy: WindowPolicy,
    ) -> Result<TimeInterval, UpdateQueryError> {
        // Both bounds are parsed before defaults are applied so a bad `from`
        // is reported even when `to` is also missing.
        let from_at = from.map(|raw| parse_timestamp(raw, "from")).transpose()?;
        let to_at = to.map(|raw| parse_timestamp(raw, "to")).transpose()?;

        let (from_at, to_at) = match policy {
            WindowPolicy::Recent(lookback) => {
                let to_at = to_at.unwrap_or_else(|| self.clock.now());
                let from_at = match from_at {
                    Some(from_at) => from_at,
                    None => to_at.checked_sub_signed(lookback).ok_or_else(|| {
                        UpdateQueryError::InvalidTimestamp {
                            param: "to",
                            value: to.map_or_else(|| to_at.to_string(), str::to_string),
                        }
                    })?,
                };
                (from_at, to_at)
            }
            WindowPolicy::FullRetention => (
                from_at.unwrap_or_else(long_ago),
                to_at.unwrap_or_else(the_future),
            ),
        };

        Ok(TimeInterval::open_closed(from_at, to_at)?)
    }

    /// Window for the global update feed
    pub fn resolve_recent(&self, from: Option<&str>, to: Option<&str>) -> Result<TimeInterval, UpdateQueryError> {
        self.resolve(from, to, WindowPolicy::recent())
    }

    /// Window for a single entity's history
    pub fn resolve_full_retention(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<TimeInterval, UpdateQueryError> {
        self.resolve(from, to, WindowPolicy::FullRetention)
    }
}
