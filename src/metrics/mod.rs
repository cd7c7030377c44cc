use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for the update feeds
// ============================================================================
//
// Provides metrics for:
// - Query volume per feed and granularity
// - Query failures by error kind
// - Query latency
// - Result volume
// - Digest enrichment fallbacks
//
// All metrics are registered with Prometheus and scraped via /metrics
// ============================================================================

pub const GLOBAL_FEED: &str = "global";
pub const ENTITY_FEED: &str = "entity";

/// Central metrics registry for the service
pub struct Metrics {
    registry: Registry,

    // Query Metrics
    pub queries_total: IntCounterVec,
    pub query_failures: IntCounterVec,
    pub query_duration: HistogramVec,
    pub results_returned: IntCounterVec,

    // Projection Metrics
    pub enrichment_fallbacks: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let queries_total = IntCounterVec::new(
            Opts::new("update_queries_total", "Total update queries served"),
            &["feed", "detail"],
        )?;
        registry.register(Box::new(queries_total.clone()))?;

        let query_failures = IntCounterVec::new(
            Opts::new("update_query_failures_total", "Total update queries that failed"),
            &["feed", "reason"],
        )?;
        registry.register(Box::new(query_failures.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new("update_query_duration_seconds", "Update query duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["feed"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        let results_returned = IntCounterVec::new(
            Opts::new("update_results_returned_total", "Total update records returned"),
            &["feed"],
        )?;
        registry.register(Box::new(results_returned.clone()))?;

        let enrichment_fallbacks = IntCounter::new(
            "digest_enrichment_fallbacks_total",
            "Digests served with an empty summary after a failed lookup",
        )?;
        registry.register(Box::new(enrichment_fallbacks.clone()))?;

        Ok(Self {
            registry,
            queries_total,
            query_failures,
            query_duration,
            results_returned,
            enrichment_fallbacks,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a served query
    pub fn record_query(&self, feed: &str, detail: bool, duration_secs: f64, returned: usize) {
        let detail = if detail { "true" } else { "false" };
        self.queries_total.with_label_values(&[feed, detail]).inc();
        self.query_duration.with_label_values(&[feed]).observe(duration_secs);
        self.results_returned.with_label_values(&[feed]).inc_by(returned as u64);
    }

    /// Helper to record a failed query
    pub fn record_failure(&self, feed: &str, reason: &str) {
        self.query_failures.with_label_values(&[feed, reason]).inc();
    }
}
