//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Generation calls by stage (direct, chunk, reduce) and outcome
    pub generation_requests: CounterVec,
    pub generation_duration: HistogramVec,

    // Summary runs
    pub summaries: CounterVec,
    pub chunks_per_summary: Histogram,
    pub budget_failures: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let generation_requests = register_counter_vec_with_registry!(
            Opts::new("generation_requests_total", "Total generation service requests"),
            &["stage", "status"],
            registry
        )?;

        let generation_duration = register_histogram_vec_with_registry!(
            "generation_request_duration_seconds",
            "Generation request duration in seconds",
            &["stage"],
            registry
        )?;

        let summaries = register_counter_vec_with_registry!(
            Opts::new("summaries_total", "Total summaries by generation mode"),
            &["mode"],
            registry
        )?;

        let chunks_per_summary = register_histogram_with_registry!(
            "summary_chunks",
            "Chunks produced per chunked summary",
            registry
        )?;

        let budget_failures = register_counter_with_registry!(
            Opts::new(
                "budget_failures_total",
                "Runs rejected because the request budget was not positive"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            generation_requests,
            generation_duration,
            summaries,
            chunks_per_summary,
            budget_failures,
        })
    }

    /// Record one generation call
    pub fn record_generation(&self, stage: &str, success: bool, seconds: f64) {
        let status = if success { "success" } else { "error" };
        self.generation_requests
            .with_label_values(&[stage, status])
            .inc();
        self.generation_duration
            .with_label_values(&[stage])
            .observe(seconds);
    }

    /// Record which path a summary took
    pub fn record_summary(&self, mode: &str, chunks: usize) {
        self.summaries.with_label_values(&[mode]).inc();
        if chunks > 0 {
            self.chunks_per_summary.observe(chunks as f64);
        }
    }

    /// Record a run rejected for an unusable budget
    pub fn record_budget_failure(&self) {
        self.budget_failures.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
