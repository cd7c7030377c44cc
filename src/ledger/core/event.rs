use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

// ============================================================================
// Update Event Model
// ============================================================================
//
// An update event is the recorded fact that a versioned entity changed at a
// point in time. Events are immutable once the store has recorded them.
//
// This module is GENERIC over the entity identifier type, so the same ledger
// works for calendars, agendas, bills, or any other versioned entity.
//
// ============================================================================

/// Identifier of a versioned entity tracked by the ledger
///
/// The total order (`Ord`) is used to break ties between events that share a
/// timestamp, so it must be stable across processes.
pub trait EntityId:
    Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the entity type, e.g. "calendar"
    const ENTITY_TYPE: &'static str;

    /// Stable textual key used by persistent stores
    fn storage_key(&self) -> String;

    /// Inverse of `storage_key`
    fn from_storage_key(key: &str) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized value: {0}")]
pub struct UnknownVariant(pub String);

/// Which lane of the ledger an update was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    /// Change recorded internally
    Processed,
    /// Change recorded as externally visible
    #[default]
    Published,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Processed => "PROCESSED",
            UpdateType::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(UpdateType::Processed),
            "published" => Ok(UpdateType::Published),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Summary of what changed in an update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Summary {
    /// Placeholder used when no detail could be produced
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.table.is_none() && self.fields.is_empty()
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Immutable record of an entity change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent<I> {
    pub entity_id: I,
    pub update_type: UpdateType,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub detail: Option<Summary>,
}

impl<I: EntityId> UpdateEvent<I> {
    pub fn new(entity_id: I, update_type: UpdateType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            entity_id,
            update_type,
            occurred_at,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Summary) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Cheap projection: which entity changed and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateToken<I> {
    pub id: I,
    pub occurred_at: DateTime<Utc>,
}

impl<I: EntityId> From<&UpdateEvent<I>> for UpdateToken<I> {
    fn from(event: &UpdateEvent<I>) -> Self {
        Self {
            id: event.entity_id.clone(),
            occurred_at: event.occurred_at,
        }
    }
}

/// Enriched projection carrying a change summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDigest<I> {
    pub id: I,
    pub occurred_at: DateTime<Utc>,
    pub detail: Summary,
}

/// Either granularity, chosen once per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UpdateRecord<I> {
    Token(UpdateToken<I>),
    Digest(UpdateDigest<I>),
}

impl<I: EntityId> UpdateRecord<I> {
    pub fn id(&self) -> &I {
        match self {
            UpdateRecord::Token(token) => &token.id,
            UpdateRecord::Digest(digest) => &digest.id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UpdateRecord::Token(token) => token.occurred_at,
            UpdateRecord::Digest(digest) => digest.occurred_at,
        }
    }

    pub fn is_digest(&self) -> bool {
        matches!(self, UpdateRecord::Digest(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
