use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use update_ledger::config::{AppConfig, StoreBackend};
use update_ledger::domain::CalendarId;
use update_ledger::ledger::{InMemoryUpdateStore, ScyllaUpdateStore, SeedFile, UpdateEventStore};
use update_ledger::metrics::Metrics;
use update_ledger::query::{SystemClock, UpdateService};
use update_ledger::api;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,update_ledger=debug"))
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        store = ?config.store,
        port = config.port,
        default_limit = config.default_limit,
        "Starting update ledger"
    );

    // === 1. Open the update event store ===
    let store: Arc<dyn UpdateEventStore<CalendarId>> = match config.store {
        StoreBackend::Memory => match &config.seed_file {
            Some(path) => Arc::new(InMemoryUpdateStore::<CalendarId>::load_seed_file(path).await?),
            None => {
                tracing::warn!("No LEDGER_SEED_FILE set, serving an empty in-memory ledger");
                Arc::new(InMemoryUpdateStore::<CalendarId>::new())
            }
        },
        StoreBackend::Scylla => {
            tracing::info!(node = %config.scylla_node, "Connecting to ScyllaDB...");
            let session: Session = SessionBuilder::new()
                .known_node(&config.scylla_node)
                .build()
                .await?;
            ScyllaUpdateStore::<CalendarId>::ensure_schema(&session, &config.keyspace).await?;
            let store = ScyllaUpdateStore::<CalendarId>::new(Arc::new(session));

            if let Some(path) = &config.seed_file {
                let seed = SeedFile::<CalendarId>::load(path).await?;
                store.import_seed(&seed).await?;
            }

            Arc::new(store)
        }
    };

    // === 2. Initialize Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Build the query service and serve ===
    let service = UpdateService::new(store, Arc::new(SystemClock))
        .with_default_limit(config.default_limit)
        .with_fallback_counter(metrics.enrichment_fallbacks.clone());

    api::serve(&config.bind_addr, config.port, service, metrics).await?;

    tracing::info!("Update ledger stopped");
    Ok(())
}
