use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::EntityId;

// ============================================================================
// Calendar Identifier
// ============================================================================

/// A floor calendar, identified by its number within a session year
///
/// Ordered by year, then calendar number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarId {
    pub year: i32,
    #[serde(rename = "calendarNo")]
    pub number: i32,
}

impl CalendarId {
    pub fn new(year: i32, number: i32) -> Self {
        Self { year, number }
    }
}

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.number)
    }
}

impl EntityId for CalendarId {
    const ENTITY_TYPE: &'static str = "calendar";

    fn storage_key(&self) -> String {
        self.to_string()
    }

    fn from_storage_key(key: &str) -> Option<Self> {
        let (year, number) = key.split_once('-')?;
        Some(Self::new(year.parse().ok()?, number.parse().ok()?))
    }
}
