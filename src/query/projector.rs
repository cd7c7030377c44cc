use prometheus::IntCounter;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ledger::{EntityId, Summary, UpdateDigest, UpdateEvent, UpdateEventStore, UpdateRecord, UpdateToken};

// ============================================================================
// Result Projector
// ============================================================================
//
// Maps a windowed slice of events to tokens or digests, one record per event,
// order preserved. Digest enrichment is best-effort: a failed or empty
// current-state lookup yields an empty summary and the query goes on.
//
// ============================================================================

pub struct ResultProjector<I: EntityId> {
    store: Arc<dyn UpdateEventStore<I>>,
    fallbacks: Option<IntCounter>,
}

impl<I: EntityId> ResultProjector<I> {
    pub fn new(store: Arc<dyn UpdateEventStore<I>>) -> Self {
        Self { store, fallbacks: None }
    }

    /// Count enrichment fallbacks on `counter`
    pub fn with_fallback_counter(mut self, counter: IntCounter) -> Self {
        self.fallbacks = Some(counter);
        self
    }

    pub fn tokens(&self, events: &[UpdateEvent<I>]) -> Vec<UpdateToken<I>> {
        events.iter().map(UpdateToken::from).collect()
    }

    pub async fn digests(&self, events: Vec<UpdateEvent<I>>) -> Vec<UpdateDigest<I>> {
        // Lookups are shared within one projection only
        let mut enriched: HashMap<I, Summary> = HashMap::new();
        let mut digests = Vec::with_capacity(events.len());

        for event in events {
            let detail = match event.detail {
                Some(detail) => detail,
                None => match enriched.get(&event.entity_id) {
                    Some(summary) => summary.clone(),
                    None => {
                        let summary = self.enrich(&event.entity_id).await;
                        enriched.insert(event.entity_id.clone(), summary.clone());
                        summary
                    }
                },
            };

            digests.push(UpdateDigest {
                id: event.entity_id,
                occurred_at: event.occurred_at,
                detail,
            });
        }

        digests
    }

    pub async fn records(&self, events: Vec<UpdateEvent<I>>, detail: bool) -> Vec<UpdateRecord<I>> {
        if detail {
            self.digests(events)
                .await
                .into_iter()
                .map(UpdateRecord::Digest)
                .collect()
        } else {
            self.tokens(&events)
                .into_iter()
                .map(UpdateRecord::Token)
                .collect()
        }
    }

    async fn enrich(&self, entity_id: &I) -> Summary {
        match self.store.fetch_current_summary(entity_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                tracing::warn!(
                    entity_type = I::ENTITY_TYPE,
                    entity_id = %entity_id,
                    "No current summary for digest, using empty summary"
                );
                self.record_fallback();
                Summary::empty()
            }
            Err(e) => {
                tracing::warn!(
                    entity_type = I::ENTITY_TYPE,
                    entity_id = %entity_id,
                    error = %e,
                    "Digest enrichment lookup failed, using empty summary"
                );
                self.record_fallback();
                Summary::empty()
            }
        }
    }

    fn record_fallback(&self) {
        if let Some(counter) = &self.fallbacks {
            counter.inc();
        }
    }
}
