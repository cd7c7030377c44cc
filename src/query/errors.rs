use chrono::{DateTime, Utc};

use crate::ledger::{ConsistencyError, InvalidInterval, StoreError};

// ============================================================================
// Update Query Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UpdateQueryError {
    #[error("Invalid timestamp for parameter '{param}': {value}")]
    InvalidTimestamp { param: &'static str, value: String },

    #[error("Invalid range: 'from' ({from}) is after 'to' ({to})")]
    InvalidRange { from: DateTime<Utc>, to: DateTime<Utc> },

    #[error("Update store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("Internal consistency violation: {0}")]
    Consistency(#[from] ConsistencyError),
}

impl UpdateQueryError {
    /// Request parameter the caller should correct, if any
    pub fn param(&self) -> Option<&'static str> {
        match self {
            UpdateQueryError::InvalidTimestamp { param, .. } => Some(*param),
            UpdateQueryError::InvalidRange { .. } => Some("from"),
            _ => None,
        }
    }

    /// Short label used by metrics
    pub fn reason(&self) -> &'static str {
        match self {
            UpdateQueryError::InvalidTimestamp { .. } => "invalid_timestamp",
            UpdateQueryError::InvalidRange { .. } => "invalid_range",
            UpdateQueryError::StoreUnavailable(_) => "store_unavailable",
            UpdateQueryError::Consistency(_) => "consistency",
        }
    }
}

impl From<InvalidInterval> for UpdateQueryError {
    fn from(err: InvalidInterval) -> Self {
        UpdateQueryError::InvalidRange { from: err.from, to: err.to }
    }
}

impl From<StoreError> for UpdateQueryError {
    fn from(err: StoreError) -> Self {
        UpdateQueryError::StoreUnavailable(err)
    }
}
