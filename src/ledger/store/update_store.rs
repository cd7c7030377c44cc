use async_trait::async_trait;

use crate::ledger::core::{EntityId, Summary, TimeInterval, UpdateEvent, UpdateType};
use crate::utils::IsTransient;

// ============================================================================
// Update Event Store - Collaborator Contract
// ============================================================================
//
// Implementations are expected to apply interval membership with the same
// inclusive/exclusive semantics as `TimeInterval::contains`. The engine
// re-filters every fetched event, so a store that can only express closed
// ranges (e.g. a CQL clustering range) is still correct.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode stored update: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait]
pub trait UpdateEventStore<I: EntityId>: Send + Sync {
    /// Events of `update_type` inside `interval`, optionally scoped to one
    /// entity. Unordered and unpaginated.
    async fn fetch_events(
        &self,
        update_type: UpdateType,
        scope: Option<&I>,
        interval: &TimeInterval,
    ) -> Result<Vec<UpdateEvent<I>>, StoreError>;

    /// Summary of the entity's current state, if the store knows one
    async fn fetch_current_summary(&self, entity_id: &I) -> Result<Option<Summary>, StoreError>;
}
