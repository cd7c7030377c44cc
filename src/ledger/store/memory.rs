use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::ledger::core::{EntityId, Summary, TimeInterval, UpdateEvent, UpdateType};
use super::update_store::{StoreError, UpdateEventStore};

// ============================================================================
// In-Memory Update Store
// ============================================================================
//
// Append-only event log held in process memory. Used for local runs (seeded
// from a JSON file) and as the deterministic store behind unit tests.
//
// ============================================================================

/// Summary entry of a seed file
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSummary<I> {
    pub id: I,
    pub summary: Summary,
}

/// On-disk seed format: `{ "events": [...], "summaries": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct SeedFile<I> {
    #[serde(default = "Vec::new")]
    pub events: Vec<UpdateEvent<I>>,
    #[serde(default = "Vec::new")]
    pub summaries: Vec<SeedSummary<I>>,
}

impl<I: EntityId> SeedFile<I> {
    /// Read and parse a seed file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: SeedFile<I> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            events = seed.events.len(),
            summaries = seed.summaries.len(),
            entity_type = I::ENTITY_TYPE,
            "Loaded update seed file"
        );

        Ok(seed)
    }
}

pub struct InMemoryUpdateStore<I: EntityId> {
    events: RwLock<Vec<UpdateEvent<I>>>,
    summaries: RwLock<HashMap<I, Summary>>,
}

impl<I: EntityId> Default for InMemoryUpdateStore<I> {
    fn default() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            summaries: RwLock::new(HashMap::new()),
        }
    }
}

impl<I: EntityId> InMemoryUpdateStore<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedFile<I>) -> Self {
        let summaries = seed
            .summaries
            .into_iter()
            .map(|entry| (entry.id, entry.summary))
            .collect();

        Self {
            events: RwLock::new(seed.events),
            summaries: RwLock::new(summaries),
        }
    }

    /// Load a seed file from disk
    pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_seed(SeedFile::load(path).await?))
    }

    /// Record an update event
    pub async fn append(&self, event: UpdateEvent<I>) {
        self.events.write().await.push(event);
    }

    pub async fn extend(&self, events: impl IntoIterator<Item = UpdateEvent<I>>) {
        self.events.write().await.extend(events);
    }

    /// Set the current-state summary used for digest enrichment
    pub async fn set_summary(&self, entity_id: I, summary: Summary) {
        self.summaries.write().await.insert(entity_id, summary);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl<I: EntityId> UpdateEventStore<I> for InMemoryUpdateStore<I> {
    async fn fetch_events(
        &self,
        update_type: UpdateType,
        scope: Option<&I>,
        interval: &TimeInterval,
    ) -> Result<Vec<UpdateEvent<I>>, StoreError> {
        let events = self.events.read().await;
        let matching: Vec<UpdateEvent<I>> = events
            .iter()
            .filter(|event| event.update_type == update_type)
            .filter(|event| scope.map_or(true, |id| &event.entity_id == id))
            .filter(|event| interval.contains(event.occurred_at))
            .cloned()
            .collect();

        tracing::debug!(
            entity_type = I::ENTITY_TYPE,
            update_type = %update_type,
            interval = %interval,
            fetched = matching.len(),
            "Fetched update events from memory"
        );

        Ok(matching)
    }

    async fn fetch_current_summary(&self, entity_id: &I) -> Result<Option<Summary>, StoreError> {
        Ok(self.summaries.read().await.get(entity_id).cloned())
    }
}
