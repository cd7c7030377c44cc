use prometheus::IntCounter;
use std::sync::Arc;

use crate::ledger::{EntityId, LimitOffset, Page, UpdateDigest, UpdateEventStore, UpdateRecord};
use super::clock::Clock;
use super::engine::UpdateQueryEngine;
use super::errors::UpdateQueryError;
use super::params::{UpdateQueryParams, DEFAULT_LIMIT};
use super::time_range::TimeRangeResolver;

// ============================================================================
// Update Service - Caller-Facing Operations
// ============================================================================
//
// Resolves the request's time window, then hands the query to the engine.
// Transport adapters (HTTP, CLI) build an `UpdateQueryParams` and call in here.
//
// ============================================================================

pub struct UpdateService<I: EntityId> {
    engine: UpdateQueryEngine<I>,
    resolver: TimeRangeResolver,
    default_limit: usize,
}

impl<I: EntityId> UpdateService<I> {
    pub fn new(store: Arc<dyn UpdateEventStore<I>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: UpdateQueryEngine::new(store),
            resolver: TimeRangeResolver::new(clock),
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_fallback_counter(mut self, counter: IntCounter) -> Self {
        self.engine = self.engine.with_fallback_counter(counter);
        self
    }

    /// Defaults for a global feed request
    pub fn global_defaults(&self) -> UpdateQueryParams {
        UpdateQueryParams::for_global_feed().with_limit_offset(LimitOffset::new(self.default_limit, 0))
    }

    /// Defaults for an entity history request
    pub fn entity_defaults(&self) -> UpdateQueryParams {
        UpdateQueryParams::for_entity_feed()
    }

    /// Global update feed; missing bounds default to the last seven days
    pub async fn list_updates(
        &self,
        params: &UpdateQueryParams,
    ) -> Result<Page<UpdateRecord<I>>, UpdateQueryError> {
        let interval = self
            .resolver
            .resolve_recent(params.from.as_deref(), params.to.as_deref())?;

        self.engine
            .query_records_in_range(
                params.update_type,
                &interval,
                params.order,
                params.limit_offset,
                params.detail,
            )
            .await
    }

    /// History of one entity; missing bounds span full retention
    pub async fn list_updates_for_entity(
        &self,
        entity_id: &I,
        params: &UpdateQueryParams,
    ) -> Result<Page<UpdateDigest<I>>, UpdateQueryError> {
        let interval = self
            .resolver
            .resolve_full_retention(params.from.as_deref(), params.to.as_deref())?;

        self.engine
            .query_updates_for_entity(
                params.update_type,
                entity_id,
                &interval,
                params.order,
                params.limit_offset,
            )
            .await
    }
}
