use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use scylla::client::session::Session;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ledger::core::{EntityId, Summary, TimeInterval, UpdateEvent, UpdateType};
use crate::utils::{retry_on_transient, RetryConfig};
use super::memory::SeedFile;
use super::update_store::{StoreError, UpdateEventStore};

// ============================================================================
// ScyllaDB Update Store
// ============================================================================
//
// Schema:
//
//   update_events
//     PRIMARY KEY ((entity_type, update_type), occurred_at, entity_key)
//     detail text                 -- JSON Summary, nullable
//
//   update_events_by_entity
//     PRIMARY KEY ((entity_type, entity_key, update_type), occurred_at)
//     detail text
//
//   entity_summaries
//     PRIMARY KEY ((entity_type, entity_key))
//     summary text                -- JSON Summary
//
// Every event is written to both event tables. Global reads scan the
// `update_events` partition, scoped reads go straight to the entity's own
// partition. Both are paged.
//
// A CQL clustering range can only express closed bounds, so reads fetch
// `[from, to]` and the query engine drops whatever an exclusive bound rules
// out.
//
// ============================================================================

const FETCH_EVENTS: &str = "SELECT entity_key, occurred_at, detail FROM update_events \
     WHERE entity_type = ? AND update_type = ? AND occurred_at >= ? AND occurred_at <= ?";

const FETCH_ENTITY_EVENTS: &str = "SELECT entity_key, occurred_at, detail FROM update_events_by_entity \
     WHERE entity_type = ? AND entity_key = ? AND update_type = ? AND occurred_at >= ? AND occurred_at <= ?";

const FETCH_SUMMARY: &str =
    "SELECT summary FROM entity_summaries WHERE entity_type = ? AND entity_key = ?";

const INSERT_EVENT: &str = "INSERT INTO update_events \
     (entity_type, update_type, occurred_at, entity_key, detail) VALUES (?, ?, ?, ?, ?)";

const INSERT_ENTITY_EVENT: &str = "INSERT INTO update_events_by_entity \
     (entity_type, entity_key, update_type, occurred_at, detail) VALUES (?, ?, ?, ?, ?)";

const INSERT_SUMMARY: &str =
    "INSERT INTO entity_summaries (entity_type, entity_key, summary) VALUES (?, ?, ?)";

/// `(entity_key, occurred_at, detail)` as stored in both event tables
type EventRow = (String, DateTime<Utc>, Option<String>);

fn encode_event<I: EntityId>(event: &UpdateEvent<I>) -> Result<EventRow, StoreError> {
    let detail = event
        .detail
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    Ok((event.entity_id.storage_key(), event.occurred_at, detail))
}

fn decode_event<I: EntityId>(update_type: UpdateType, row: EventRow) -> Result<UpdateEvent<I>, StoreError> {
    let (entity_key, occurred_at, detail_json) = row;

    let entity_id = I::from_storage_key(&entity_key).ok_or_else(|| {
        StoreError::Decode(format!("Malformed {} key: {}", I::ENTITY_TYPE, entity_key))
    })?;
    let detail = detail_json
        .map(|json| serde_json::from_str::<Summary>(&json))
        .transpose()?;

    Ok(UpdateEvent {
        entity_id,
        update_type,
        occurred_at,
        detail,
    })
}

pub struct ScyllaUpdateStore<I: EntityId> {
    session: Arc<Session>,
    retry: RetryConfig,
    _phantom: PhantomData<I>,
}

impl<I: EntityId> ScyllaUpdateStore<I> {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            retry: RetryConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Create the keyspace and tables if missing, then switch to the keyspace
    pub async fn ensure_schema(session: &Session, keyspace: &str) -> anyhow::Result<()> {
        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
                ),
                &[],
            )
            .await?;

        session.use_keyspace(keyspace, false).await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS update_events (
                    entity_type text,
                    update_type text,
                    occurred_at timestamp,
                    entity_key text,
                    detail text,
                    PRIMARY KEY ((entity_type, update_type), occurred_at, entity_key)
                )",
                &[],
            )
            .await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS update_events_by_entity (
                    entity_type text,
                    entity_key text,
                    update_type text,
                    occurred_at timestamp,
                    detail text,
                    PRIMARY KEY ((entity_type, entity_key, update_type), occurred_at)
                )",
                &[],
            )
            .await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS entity_summaries (
                    entity_type text,
                    entity_key text,
                    summary text,
                    PRIMARY KEY ((entity_type, entity_key))
                )",
                &[],
            )
            .await?;

        tracing::info!(keyspace = %keyspace, "Update ledger schema ready");
        Ok(())
    }

    /// Record an update event in the global and per-entity tables
    pub async fn record_event(&self, event: &UpdateEvent<I>) -> Result<(), StoreError> {
        let (entity_key, occurred_at, detail) = encode_event(event)?;
        let update_type = event.update_type.as_str();

        self.session
            .query_unpaged(
                INSERT_EVENT,
                (I::ENTITY_TYPE, update_type, occurred_at, entity_key.as_str(), detail.as_deref()),
            )
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        self.session
            .query_unpaged(
                INSERT_ENTITY_EVENT,
                (I::ENTITY_TYPE, entity_key.as_str(), update_type, occurred_at, detail.as_deref()),
            )
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::debug!(
            entity_type = I::ENTITY_TYPE,
            entity_id = %event.entity_id,
            update_type = %event.update_type,
            "Recorded update event"
        );
        Ok(())
    }

    /// Replace the current-state summary of an entity
    pub async fn put_summary(&self, entity_id: &I, summary: &Summary) -> Result<(), StoreError> {
        let summary_json = serde_json::to_string(summary)?;

        self.session
            .query_unpaged(INSERT_SUMMARY, (I::ENTITY_TYPE, entity_id.storage_key(), summary_json))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    /// Write every event and summary of a seed file
    pub async fn import_seed(&self, seed: &SeedFile<I>) -> Result<(), StoreError> {
        for event in &seed.events {
            self.record_event(event).await?;
        }
        for entry in &seed.summaries {
            self.put_summary(&entry.id, &entry.summary).await?;
        }

        tracing::info!(
            entity_type = I::ENTITY_TYPE,
            events = seed.events.len(),
            summaries = seed.summaries.len(),
            "Imported update seed into ScyllaDB"
        );
        Ok(())
    }

    async fn read_events(
        session: Arc<Session>,
        update_type: UpdateType,
        scope: Option<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UpdateEvent<I>>, StoreError> {
        let pager = match &scope {
            Some(entity_key) => {
                session
                    .query_iter(
                        FETCH_ENTITY_EVENTS,
                        (I::ENTITY_TYPE, entity_key.as_str(), update_type.as_str(), from, to),
                    )
                    .await
            }
            None => {
                session
                    .query_iter(FETCH_EVENTS, (I::ENTITY_TYPE, update_type.as_str(), from, to))
                    .await
            }
        }
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut rows = pager
            .rows_stream::<EventRow>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await {
            let row = row.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            events.push(decode_event(update_type, row)?);
        }

        Ok(events)
    }
}

#[async_trait]
impl<I: EntityId> UpdateEventStore<I> for ScyllaUpdateStore<I> {
    async fn fetch_events(
        &self,
        update_type: UpdateType,
        scope: Option<&I>,
        interval: &TimeInterval,
    ) -> Result<Vec<UpdateEvent<I>>, StoreError> {
        let (from, to) = (interval.from(), interval.to());
        let scope_key = scope.map(|id| id.storage_key());

        let events = retry_on_transient(&self.retry, |_attempt| {
            Self::read_events(self.session.clone(), update_type, scope_key.clone(), from, to)
        })
        .await
        .into_result()?;

        tracing::debug!(
            entity_type = I::ENTITY_TYPE,
            update_type = %update_type,
            scope = ?scope_key,
            interval = %interval,
            fetched = events.len(),
            "Fetched update events from ScyllaDB"
        );

        Ok(events)
    }

    async fn fetch_current_summary(&self, entity_id: &I) -> Result<Option<Summary>, StoreError> {
        let result = self
            .session
            .query_unpaged(FETCH_SUMMARY, (I::ENTITY_TYPE, entity_id.storage_key()))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None),
        };

        match rows_result.maybe_first_row::<(String,)>() {
            Ok(Some((summary_json,))) => Ok(Some(serde_json::from_str(&summary_json)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Decode(e.to_string())),
        }
    }
}
