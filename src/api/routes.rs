use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::time::Instant;

use crate::domain::CalendarId;
use crate::ledger::{LimitOffset, SortOrder, UpdateType};
use crate::metrics::{Metrics, ENTITY_FEED, GLOBAL_FEED};
use crate::query::{UpdateQueryError, UpdateQueryParams, UpdateService};
use super::response::{ApiError, ListViewResponse};

// ============================================================================
// Calendar Update Routes
// ============================================================================
//
//   GET /api/3/calendars/updates                      past seven days
//   GET /api/3/calendars/updates/{from}               from .. now
//   GET /api/3/calendars/updates/{from}/{to}
//   GET /api/3/calendars/{year}/{number}/updates      full history
//   GET /api/3/calendars/{year}/{number}/updates/{from}/{to}
//
// Query parameters: detail, type, order, limit ("all" = unbounded), offset
//
// ============================================================================

pub const BASE_PATH: &str = "/api/3/calendars";

type CalendarService = web::Data<UpdateService<CalendarId>>;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequestQuery {
    pub detail: Option<String>,
    #[serde(rename = "type")]
    pub update_type: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl UpdateRequestQuery {
    /// Overlay the supplied parameters on `params`
    pub fn apply(&self, mut params: UpdateQueryParams) -> Result<UpdateQueryParams, ApiError> {
        if let Some(detail) = &self.detail {
            params.detail = match detail.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(invalid("detail", detail)),
            };
        }
        if let Some(raw) = &self.update_type {
            params.update_type = raw.parse::<UpdateType>().map_err(|_| invalid("type", raw))?;
        }
        if let Some(raw) = &self.order {
            params.order = raw.parse::<SortOrder>().map_err(|_| invalid("order", raw))?;
        }
        if let Some(raw) = &self.limit {
            params.limit_offset.limit = if raw.trim().eq_ignore_ascii_case("all") {
                None
            } else {
                Some(raw.trim().parse().map_err(|_| invalid("limit", raw))?)
            };
        }
        if let Some(raw) = &self.offset {
            params.limit_offset = LimitOffset {
                offset: raw.trim().parse().map_err(|_| invalid("offset", raw))?,
                ..params.limit_offset
            };
        }
        Ok(params)
    }
}

fn invalid(param: &'static str, value: &str) -> ApiError {
    ApiError::InvalidParameter {
        param,
        value: value.to_string(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Years are four digits, so only an oversized calendar number can fail
    // to extract
    let path_config = web::PathConfig::default().error_handler(|err, _req| {
        ApiError::InvalidParameter {
            param: "number",
            value: err.to_string(),
        }
        .into()
    });

    cfg.service(
        web::scope(BASE_PATH)
            .app_data(path_config)
            .route("/updates", web::get().to(updates))
            .route("/updates/{from}", web::get().to(updates_from))
            .route("/updates/{from}/{to}", web::get().to(updates_during))
            .route(r"/{year:\d{4}}/{number:\d+}/updates", web::get().to(calendar_updates))
            .route(
                r"/{year:\d{4}}/{number:\d+}/updates/{from}/{to}",
                web::get().to(calendar_updates_during),
            ),
    );
}

async fn updates(
    service: CalendarService,
    metrics: web::Data<Metrics>,
    query: web::Query<UpdateRequestQuery>,
) -> Result<HttpResponse, ApiError> {
    global_feed(&service, &metrics, None, None, &query).await
}

async fn updates_from(
    service: CalendarService,
    metrics: web::Data<Metrics>,
    path: web::Path<String>,
    query: web::Query<UpdateRequestQuery>,
) -> Result<HttpResponse, ApiError> {
    global_feed(&service, &metrics, Some(path.into_inner()), None, &query).await
}

async fn updates_during(
    service: CalendarService,
    metrics: web::Data<Metrics>,
    path: web::Path<(String, String)>,
    query: web::Query<UpdateRequestQuery>,
) -> Result<HttpResponse, ApiError> {
    let (from, to) = path.into_inner();
    global_feed(&service, &metrics, Some(from), Some(to), &query).await
}

async fn calendar_updates(
    service: CalendarService,
    metrics: web::Data<Metrics>,
    path: web::Path<(i32, i32)>,
    query: web::Query<UpdateRequestQuery>,
) -> Result<HttpResponse, ApiError> {
    let (year, number) = path.into_inner();
    entity_feed(&service, &metrics, CalendarId::new(year, number), None, None, &query).await
}

async fn calendar_updates_during(
    service: CalendarService,
    metrics: web::Data<Metrics>,
    path: web::Path<(i32, i32, String, String)>,
    query: web::Query<UpdateRequestQuery>,
) -> Result<HttpResponse, ApiError> {
    let (year, number, from, to) = path.into_inner();
    entity_feed(&service, &metrics, CalendarId::new(year, number), Some(from), Some(to), &query).await
}

async fn global_feed(
    service: &UpdateService<CalendarId>,
    metrics: &Metrics,
    from: Option<String>,
    to: Option<String>,
    query: &UpdateRequestQuery,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();

    let outcome = async {
        let params = query.apply(service.global_defaults())?.with_range(from, to);
        let page = service.list_updates(&params).await?;
        Ok::<_, ApiError>((params.detail, page))
    }
    .await;

    match outcome {
        Ok((detail, page)) => {
            metrics.record_query(GLOBAL_FEED, detail, started.elapsed().as_secs_f64(), page.len());
            tracing::info!(
                detail = detail,
                total = page.total(),
                returned = page.len(),
                "Served calendar update feed"
            );
            let response_type = if detail { "update-digest list" } else { "update-token list" };
            Ok(HttpResponse::Ok().json(ListViewResponse::of(page, response_type)))
        }
        Err(e) => Err(reject(metrics, GLOBAL_FEED, e)),
    }
}

async fn entity_feed(
    service: &UpdateService<CalendarId>,
    metrics: &Metrics,
    calendar_id: CalendarId,
    from: Option<String>,
    to: Option<String>,
    query: &UpdateRequestQuery,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();

    let outcome = async {
        let params = query.apply(service.entity_defaults())?.with_range(from, to);
        service
            .list_updates_for_entity(&calendar_id, &params)
            .await
            .map_err(ApiError::from)
    }
    .await;

    match outcome {
        Ok(page) => {
            metrics.record_query(ENTITY_FEED, true, started.elapsed().as_secs_f64(), page.len());
            tracing::info!(
                calendar_id = %calendar_id,
                total = page.total(),
                "Served calendar update history"
            );
            Ok(HttpResponse::Ok().json(ListViewResponse::of(page, "update-digest list")))
        }
        Err(e) => Err(reject(metrics, ENTITY_FEED, e)),
    }
}

fn reject(metrics: &Metrics, feed: &str, error: ApiError) -> ApiError {
    metrics.record_failure(feed, error.reason());

    match &error {
        ApiError::Query(UpdateQueryError::StoreUnavailable(source)) => {
            tracing::error!(feed = feed, error = %source, "Update store read failed");
        }
        ApiError::Query(UpdateQueryError::Consistency(source)) => {
            tracing::error!(feed = feed, error = %source, "Update page failed consistency check");
        }
        other => {
            tracing::debug!(feed = feed, error = %other, "Rejected update request");
        }
    }

    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryUpdateStore, StoreError, Summary, TimeInterval, UpdateEvent, UpdateEventStore};
    use crate::query::FixedClock;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_and_read_body_json, call_service, init_service, read_body_json, TestRequest};
    use actix_web::App;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    /// Store whose reads always fail
    struct OfflineStore;

    #[async_trait]
    impl UpdateEventStore<CalendarId> for OfflineStore {
        async fn fetch_events(
            &self,
            _update_type: UpdateType,
            _scope: Option<&CalendarId>,
            _interval: &TimeInterval,
        ) -> Result<Vec<UpdateEvent<CalendarId>>, StoreError> {
            Err(StoreError::Unavailable("10.0.0.7:9042 connection refused".to_string()))
        }

        async fn fetch_current_summary(&self, _entity_id: &CalendarId) -> Result<Option<Summary>, StoreError> {
            Err(StoreError::Unavailable("10.0.0.7:9042 connection refused".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 12, 8, 12, 0, 0).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 12, day, hour, 0, 0).unwrap()
    }

    async fn seeded_store() -> InMemoryUpdateStore<CalendarId> {
        let store = InMemoryUpdateStore::new();
        store
            .extend(vec![
                UpdateEvent::new(CalendarId::new(2014, 1), UpdateType::Published, at(1, 10)),
                UpdateEvent::new(CalendarId::new(2014, 2), UpdateType::Published, at(1, 11)),
                UpdateEvent::new(CalendarId::new(2014, 3), UpdateType::Published, at(1, 12)),
                UpdateEvent::new(CalendarId::new(2014, 3), UpdateType::Published, at(7, 9)),
            ])
            .await;
        store
            .set_summary(CalendarId::new(2014, 3), Summary::empty().with_table("calendar"))
            .await;
        store
    }

    fn app_data_with(
        store: Arc<dyn UpdateEventStore<CalendarId>>,
        now: DateTime<Utc>,
    ) -> (web::Data<UpdateService<CalendarId>>, web::Data<Metrics>) {
        let service = UpdateService::new(store, Arc::new(FixedClock::at(now)));
        (web::Data::new(service), web::Data::new(Metrics::new().unwrap()))
    }

    async fn app_data() -> (web::Data<UpdateService<CalendarId>>, web::Data<Metrics>) {
        app_data_with(Arc::new(seeded_store().await), now())
    }

    #[test]
    fn test_query_overlay() {
        let query = UpdateRequestQuery {
            detail: Some("TRUE".to_string()),
            update_type: Some("processed".to_string()),
            order: Some("asc".to_string()),
            limit: Some("all".to_string()),
            offset: Some("5".to_string()),
        };

        let params = query.apply(UpdateQueryParams::for_global_feed()).unwrap();

        assert!(params.detail);
        assert_eq!(params.update_type, UpdateType::Processed);
        assert_eq!(params.order, SortOrder::Asc);
        assert_eq!(params.limit_offset, LimitOffset::unbounded(5));
    }

    #[test]
    fn test_query_overlay_rejects_bad_values() {
        let query = UpdateRequestQuery {
            limit: Some("-1".to_string()),
            ..Default::default()
        };

        let err = query.apply(UpdateQueryParams::for_global_feed()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter { param: "limit", .. }));
    }

    #[actix_web::test]
    async fn test_updates_during_window() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics.clone()).configure(configure)).await;

        let req = TestRequest::get()
            .uri("/api/3/calendars/updates/2014-12-01T10:00:00/2014-12-01T12:00:00?order=ASC&limit=10")
            .to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["result"]["size"], 2);
        assert_eq!(body["result"]["items"][0]["id"]["calendarNo"], 2);
        assert_eq!(body["result"]["items"][1]["id"]["calendarNo"], 3);
        assert!(body["result"]["items"][0].get("detail").is_none());
        assert_eq!(metrics.queries_total.with_label_values(&[GLOBAL_FEED, "false"]).get(), 1);
    }

    #[actix_web::test]
    async fn test_default_feed_covers_last_week() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let req = TestRequest::get().uri("/api/3/calendars/updates?detail=true").to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 1);
        assert_eq!(body["responseType"], "update-digest list");
        assert_eq!(body["result"]["items"][0]["detail"]["table"], "calendar");
    }

    #[actix_web::test]
    async fn test_calendar_history_ignores_pagination() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let req = TestRequest::get()
            .uri("/api/3/calendars/2014/3/updates?limit=1&offset=1")
            .to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["result"]["size"], 2);
        assert!(body["limit"].is_null());
        assert_eq!(body["offsetStart"], 0);
    }

    #[actix_web::test]
    async fn test_malformed_from_is_bad_request() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics.clone()).configure(configure)).await;

        let req = TestRequest::get().uri("/api/3/calendars/updates/not-a-date").to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["param"], "from");
        assert_eq!(body["errorCode"], "INVALID_TIMESTAMP");
        assert_eq!(
            metrics.query_failures.with_label_values(&[GLOBAL_FEED, "invalid_timestamp"]).get(),
            1
        );
    }

    #[actix_web::test]
    async fn test_reversed_range_is_bad_request() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics.clone()).configure(configure)).await;

        let req = TestRequest::get()
            .uri("/api/3/calendars/updates/2014-12-02/2014-12-01")
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["errorCode"], "INVALID_RANGE");
        assert_eq!(body["param"], "from");
        assert_eq!(
            metrics.query_failures.with_label_values(&[GLOBAL_FEED, "invalid_range"]).get(),
            1
        );
    }

    #[actix_web::test]
    async fn test_window_at_earliest_instant_does_not_fail() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let req = TestRequest::get()
            .uri("/api/3/calendars/updates/-262143-01-01/-262143-01-02")
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["total"], 0);
    }

    #[actix_web::test]
    async fn test_look_back_past_earliest_instant_is_bad_request() {
        let (service, metrics) = app_data_with(Arc::new(seeded_store().await), DateTime::<Utc>::MIN_UTC);
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let req = TestRequest::get().uri("/api/3/calendars/updates").to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["errorCode"], "INVALID_TIMESTAMP");
        assert_eq!(body["param"], "to");
    }

    #[actix_web::test]
    async fn test_store_failure_is_bad_gateway_without_detail() {
        let (service, metrics) = app_data_with(Arc::new(OfflineStore), now());
        let app = init_service(App::new().app_data(service).app_data(metrics.clone()).configure(configure)).await;

        for uri in ["/api/3/calendars/updates", "/api/3/calendars/2014/3/updates"] {
            let resp = call_service(&app, TestRequest::get().uri(uri).to_request()).await;

            assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
            let body: serde_json::Value = read_body_json(resp).await;
            assert_eq!(body["errorCode"], "UPSTREAM_FAILURE");
            assert_eq!(body["message"], "Update data is temporarily unavailable");
            assert!(!body.to_string().contains("10.0.0.7"));
        }

        assert_eq!(
            metrics.query_failures.with_label_values(&[GLOBAL_FEED, "store_unavailable"]).get(),
            1
        );
        assert_eq!(
            metrics.query_failures.with_label_values(&[ENTITY_FEED, "store_unavailable"]).get(),
            1
        );
    }

    #[actix_web::test]
    async fn test_calendar_path_must_fit_a_calendar_id() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let oversized = TestRequest::get()
            .uri("/api/3/calendars/2014/99999999999/updates")
            .to_request();
        let resp = call_service(&app, oversized).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["errorCode"], "INVALID_PARAMETER");
        assert_eq!(body["param"], "number");

        let short_year = TestRequest::get().uri("/api/3/calendars/14/3/updates").to_request();
        assert_eq!(call_service(&app, short_year).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_unknown_order_is_bad_request() {
        let (service, metrics) = app_data().await;
        let app = init_service(App::new().app_data(service).app_data(metrics).configure(configure)).await;

        let req = TestRequest::get().uri("/api/3/calendars/updates?order=sideways").to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
