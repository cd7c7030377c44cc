use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use crate::domain::CalendarId;
use crate::metrics::Metrics;
use crate::query::UpdateService;
use super::routes;

/// Serve the update API, /metrics and /health until shutdown
pub async fn serve(
    bind_addr: &str,
    port: u16,
    service: UpdateService<CalendarId>,
    metrics: Arc<Metrics>,
) -> std::io::Result<()> {
    tracing::info!("Starting update API on http://{}:{}{}", bind_addr, port, routes::BASE_PATH);

    let service = web::Data::new(service);
    let metrics = web::Data::from(metrics);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            .app_data(metrics.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Every route the service exposes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(routes::configure)
        .route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

async fn metrics_handler(metrics: web::Data<Metrics>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "update-ledger"
    }))
}
