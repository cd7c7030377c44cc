use prometheus::IntCounter;
use std::sync::Arc;

use crate::ledger::{
    EntityId, LimitOffset, Page, SortOrder, TimeInterval, UpdateDigest, UpdateEvent,
    UpdateEventStore, UpdateRecord, UpdateToken, UpdateType,
};
use super::errors::UpdateQueryError;
use super::projector::ResultProjector;

// ============================================================================
// Update Query Engine
// ============================================================================
//
// Every query runs the same pipeline against a fresh store read:
//
// 1. Empty interval -> empty page, no store call
// 2. Fetch, then re-filter by scope, update type and interval bounds
// 3. Sort by occurred_at in the requested order; equal timestamps are
//    ordered by entity id ascending whatever the overall order
// 4. total = number of matches before pagination
// 5. Skip offset, take limit
// 6. Project the window to tokens or digests
//
// The engine holds no caches or locks. Store failures surface as
// `StoreUnavailable` and are never retried here.
//
// ============================================================================

/// Sort events by timestamp in `order`, ties broken by entity id ascending
pub fn sort_events<I: EntityId>(events: &mut [UpdateEvent<I>], order: SortOrder) {
    events.sort_by(|a, b| {
        order
            .compare(&a.occurred_at, &b.occurred_at)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}

struct Selection<I> {
    window: Vec<UpdateEvent<I>>,
    total: usize,
}

pub struct UpdateQueryEngine<I: EntityId> {
    store: Arc<dyn UpdateEventStore<I>>,
    projector: ResultProjector<I>,
}

impl<I: EntityId> UpdateQueryEngine<I> {
    pub fn new(store: Arc<dyn UpdateEventStore<I>>) -> Self {
        let projector = ResultProjector::new(store.clone());
        Self { store, projector }
    }

    pub fn with_fallback_counter(mut self, counter: IntCounter) -> Self {
        self.projector = self.projector.with_fallback_counter(counter);
        self
    }

    /// Tokens for every entity of this type updated within `interval`
    pub async fn query_updates_in_range(
        &self,
        update_type: UpdateType,
        interval: &TimeInterval,
        order: SortOrder,
        limit_offset: LimitOffset,
    ) -> Result<Page<UpdateToken<I>>, UpdateQueryError> {
        let selection = self.select(update_type, None, interval, order, limit_offset).await?;
        let tokens = self.projector.tokens(&selection.window);
        Ok(Page::new(tokens, selection.total, limit_offset)?)
    }

    /// Digests for every entity of this type updated within `interval`
    pub async fn query_digests_in_range(
        &self,
        update_type: UpdateType,
        interval: &TimeInterval,
        order: SortOrder,
        limit_offset: LimitOffset,
    ) -> Result<Page<UpdateDigest<I>>, UpdateQueryError> {
        let selection = self.select(update_type, None, interval, order, limit_offset).await?;
        let digests = self.projector.digests(selection.window).await;
        Ok(Page::new(digests, selection.total, limit_offset)?)
    }

    /// Tokens or digests, chosen once by `detail`
    pub async fn query_records_in_range(
        &self,
        update_type: UpdateType,
        interval: &TimeInterval,
        order: SortOrder,
        limit_offset: LimitOffset,
        detail: bool,
    ) -> Result<Page<UpdateRecord<I>>, UpdateQueryError> {
        let selection = self.select(update_type, None, interval, order, limit_offset).await?;
        let records = self.projector.records(selection.window, detail).await;
        Ok(Page::new(records, selection.total, limit_offset)?)
    }

    /// Complete update history of one entity
    ///
    /// Caller pagination is not applied: the page always holds every match and
    /// reports `LimitOffset::ALL`.
    pub async fn query_updates_for_entity(
        &self,
        update_type: UpdateType,
        entity_id: &I,
        interval: &TimeInterval,
        order: SortOrder,
        requested: LimitOffset,
    ) -> Result<Page<UpdateDigest<I>>, UpdateQueryError> {
        if requested != LimitOffset::ALL {
            tracing::debug!(
                entity_id = %entity_id,
                limit = ?requested.limit,
                offset = requested.offset,
                "Ignoring pagination for entity history"
            );
        }

        let selection = self
            .select(update_type, Some(entity_id), interval, order, LimitOffset::ALL)
            .await?;
        let digests = self.projector.digests(selection.window).await;
        Ok(Page::new(digests, selection.total, LimitOffset::ALL)?)
    }

    async fn select(
        &self,
        update_type: UpdateType,
        scope: Option<&I>,
        interval: &TimeInterval,
        order: SortOrder,
        limit_offset: LimitOffset,
    ) -> Result<Selection<I>, UpdateQueryError> {
        if interval.is_empty() {
            return Ok(Selection { window: Vec::new(), total: 0 });
        }

        let fetched = self.store.fetch_events(update_type, scope, interval).await?;
        let fetched_count = fetched.len();

        let mut matching: Vec<UpdateEvent<I>> = fetched
            .into_iter()
            .filter(|event| event.update_type == update_type)
            .filter(|event| scope.map_or(true, |id| &event.entity_id == id))
            .filter(|event| interval.contains(event.occurred_at))
            .collect();

        if matching.len() != fetched_count {
            tracing::debug!(
                fetched = fetched_count,
                kept = matching.len(),
                interval = %interval,
                "Dropped fetched events outside the query bounds"
            );
        }

        sort_events(&mut matching, order);

        let total = matching.len();
        let window = limit_offset.window(matching);

        tracing::debug!(
            entity_type = I::ENTITY_TYPE,
            update_type = %update_type,
            interval = %interval,
            order = %order,
            total = total,
            returned = window.len(),
            "Selected updates"
        );

        Ok(Selection { window, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CalendarId;
    use crate::ledger::{InMemoryUpdateStore, StoreError, Summary};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 12, 1, hour, 0, 0).unwrap()
    }

    fn cal(number: i32) -> CalendarId {
        CalendarId::new(2014, number)
    }

    async fn engine_with(events: Vec<UpdateEvent<CalendarId>>) -> UpdateQueryEngine<CalendarId> {
        let store = InMemoryUpdateStore::new();
        store.extend(events).await;
        UpdateQueryEngine::<CalendarId>::new(Arc::new(store))
    }

    async fn three_hour_engine() -> UpdateQueryEngine<CalendarId> {
        engine_with(vec![
            UpdateEvent::new(cal(1), UpdateType::Published, at(10)),
            UpdateEvent::new(cal(2), UpdateType::Published, at(11)),
            UpdateEvent::new(cal(3), UpdateType::Published, at(12)),
        ])
        .await
    }

    /// Store that returns whatever it holds, ignoring every filter
    struct UnfilteredStore(Vec<UpdateEvent<CalendarId>>);

    #[async_trait]
    impl UpdateEventStore<CalendarId> for UnfilteredStore {
        async fn fetch_events(
            &self,
            _update_type: UpdateType,
            _scope: Option<&CalendarId>,
            _interval: &TimeInterval,
        ) -> Result<Vec<UpdateEvent<CalendarId>>, StoreError> {
            Ok(self.0.clone())
        }

        async fn fetch_current_summary(&self, _entity_id: &CalendarId) -> Result<Option<Summary>, StoreError> {
            Ok(None)
        }
    }

    struct OfflineStore;

    #[async_trait]
    impl UpdateEventStore<CalendarId> for OfflineStore {
        async fn fetch_events(
            &self,
            _update_type: UpdateType,
            _scope: Option<&CalendarId>,
            _interval: &TimeInterval,
        ) -> Result<Vec<UpdateEvent<CalendarId>>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn fetch_current_summary(&self, _entity_id: &CalendarId) -> Result<Option<Summary>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_open_closed_window_ascending() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::open_closed(at(10), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Asc, LimitOffset::new(10, 0))
            .await
            .unwrap();

        let times: Vec<_> = page.results().iter().map(|t| t.occurred_at).collect();
        assert_eq!(times, vec![at(11), at(12)]);
        assert_eq!(page.total(), 2);
    }

    #[tokio::test]
    async fn test_limit_one_offset_one() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::open_closed(at(10), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Asc, LimitOffset::new(1, 1))
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.results()[0].occurred_at, at(12));
        assert_eq!(page.total(), 2);
    }

    #[tokio::test]
    async fn test_offset_past_end_keeps_total() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::closed(at(10), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(10, 50))
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total(), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_counts_only() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::closed(at(10), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(0, 0))
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total(), 3);
    }

    #[tokio::test]
    async fn test_empty_interval_skips_store() {
        let engine = UpdateQueryEngine::<CalendarId>::new(Arc::new(OfflineStore));
        let interval = TimeInterval::open(at(10), at(10)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(10, 0))
            .await
            .unwrap();

        assert_eq!(page.total(), 0);
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_descending_ties_break_by_entity_ascending() {
        let engine = engine_with(vec![
            UpdateEvent::new(cal(9), UpdateType::Published, at(11)),
            UpdateEvent::new(cal(4), UpdateType::Published, at(10)),
            UpdateEvent::new(cal(2), UpdateType::Published, at(11)),
            UpdateEvent::new(CalendarId::new(2013, 50), UpdateType::Published, at(11)),
        ])
        .await;
        let interval = TimeInterval::closed(at(9), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::ALL)
            .await
            .unwrap();

        let ids: Vec<_> = page.results().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![CalendarId::new(2013, 50), cal(2), cal(9), cal(4)]);

        for pair in page.results().windows(2) {
            assert!(pair[0].occurred_at >= pair[1].occurred_at);
        }
    }

    #[tokio::test]
    async fn test_boundary_inclusivity_is_exact() {
        let engine = three_hour_engine().await;

        for (interval, expected) in [
            (TimeInterval::open(at(10), at(12)).unwrap(), 1),
            (TimeInterval::open_closed(at(10), at(12)).unwrap(), 2),
            (TimeInterval::new(at(10), at(12), true, false).unwrap(), 2),
            (TimeInterval::closed(at(10), at(12)).unwrap(), 3),
        ] {
            let page = engine
                .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Asc, LimitOffset::ALL)
                .await
                .unwrap();
            assert_eq!(page.total(), expected, "interval {interval}");
        }
    }

    #[tokio::test]
    async fn test_refilters_store_results() {
        let engine = UpdateQueryEngine::<CalendarId>::new(Arc::new(UnfilteredStore(vec![
            UpdateEvent::new(cal(1), UpdateType::Published, at(10)),
            UpdateEvent::new(cal(2), UpdateType::Published, at(11)),
            UpdateEvent::new(cal(3), UpdateType::Processed, at(11)),
            UpdateEvent::new(cal(4), UpdateType::Published, at(13)),
        ])));
        let interval = TimeInterval::open_closed(at(10), at(12)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Asc, LimitOffset::ALL)
            .await
            .unwrap();

        assert_eq!(page.total(), 1);
        assert_eq!(page.results()[0].id, cal(2));

        let history = engine
            .query_updates_for_entity(UpdateType::Published, &cal(1), &TimeInterval::closed(at(0), at(23)).unwrap(), SortOrder::Asc, LimitOffset::ALL)
            .await
            .unwrap();
        assert_eq!(history.total(), 1);
        assert_eq!(history.results()[0].id, cal(1));
    }

    #[tokio::test]
    async fn test_identical_queries_are_idempotent() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::closed(at(10), at(12)).unwrap();

        let first = engine
            .query_digests_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(2, 0))
            .await
            .unwrap();
        let second = engine
            .query_digests_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(2, 0))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_entity_history_ignores_pagination() {
        let engine = engine_with(vec![
            UpdateEvent::new(cal(1), UpdateType::Published, at(10)),
            UpdateEvent::new(cal(1), UpdateType::Published, at(11)),
            UpdateEvent::new(cal(1), UpdateType::Published, at(12)),
            UpdateEvent::new(cal(2), UpdateType::Published, at(12)),
        ])
        .await;
        let interval = TimeInterval::closed(at(0), at(23)).unwrap();

        let page = engine
            .query_updates_for_entity(UpdateType::Published, &cal(1), &interval, SortOrder::Desc, LimitOffset::new(1, 1))
            .await
            .unwrap();

        assert_eq!(page.len(), 3);
        assert_eq!(page.total(), 3);
        assert_eq!(page.applied(), LimitOffset::ALL);
        assert_eq!(page.results()[0].occurred_at, at(12));
    }

    #[tokio::test]
    async fn test_entity_history_without_events() {
        let engine = three_hour_engine().await;
        let interval = TimeInterval::open_closed(at(0), at(23)).unwrap();

        let page = engine
            .query_updates_for_entity(UpdateType::Published, &cal(77), &interval, SortOrder::Desc, LimitOffset::ALL)
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total(), 0);
    }

    #[tokio::test]
    async fn test_update_type_selects_lane() {
        let engine = engine_with(vec![
            UpdateEvent::new(cal(1), UpdateType::Processed, at(10)),
            UpdateEvent::new(cal(2), UpdateType::Published, at(11)),
        ])
        .await;
        let interval = TimeInterval::closed(at(0), at(23)).unwrap();

        let page = engine
            .query_updates_in_range(UpdateType::Processed, &interval, SortOrder::Desc, LimitOffset::ALL)
            .await
            .unwrap();

        assert_eq!(page.total(), 1);
        assert_eq!(page.results()[0].id, cal(1));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_unavailable() {
        let engine = UpdateQueryEngine::<CalendarId>::new(Arc::new(OfflineStore));
        let interval = TimeInterval::closed(at(10), at(12)).unwrap();

        let err = engine
            .query_records_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(10, 0), true)
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateQueryError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_page_invariants_hold_across_windows() {
        let engine = engine_with(
            (0..20)
                .map(|n| UpdateEvent::new(cal(n % 5), UpdateType::Published, at((n % 12) as u32)))
                .collect(),
        )
        .await;
        let interval = TimeInterval::closed(at(0), at(23)).unwrap();

        for limit in [0, 1, 3, 7, 25] {
            for offset in [0, 2, 19, 40] {
                let page = engine
                    .query_updates_in_range(UpdateType::Published, &interval, SortOrder::Desc, LimitOffset::new(limit, offset))
                    .await
                    .unwrap();
                assert!(page.len() <= limit);
                assert!(page.total() >= page.len());
                assert_eq!(page.total(), 20);
            }
        }
    }
}
