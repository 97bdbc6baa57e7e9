// src/metrics.rs
//! Metric names, one-time descriptions and the Prometheus recorder.

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("gateway_requests_total", "Network attempts made by the gateway.");
        describe_counter!("gateway_requests_success_total", "Successful network attempts.");
        describe_counter!("gateway_requests_error_total", "Failed network attempts.");
        describe_counter!("gateway_cache_hits_total", "Fetches answered from the URL cache.");
        describe_counter!("gateway_cache_misses_total", "Fetches that missed the URL cache.");
        describe_counter!(
            "gateway_rate_limit_waits_total",
            "Times the gateway throttle had to sleep."
        );
        describe_gauge!("gateway_cache_entries", "Entries in the gateway URL cache.");

        describe_counter!("signals_fetched_total", "Raw items decoded from fetched payloads.");
        describe_counter!("signals_valid_total", "Signals that passed validation.");
        describe_counter!("signals_rejected_total", "Signals refused by the validator.");
        describe_counter!("signals_duplicate_total", "Near-duplicate signals dropped.");
        describe_histogram!("signal_extract_ms", "Extraction + scoring time per item in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");

        describe_counter!("match_chunk_failures_total", "Distributor chunks that failed.");
        describe_counter!("matches_emitted_total", "Matches returned by the distributor.");
        describe_histogram!("match_distribute_ms", "Distribution wall time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static cache TTL gauge.
    pub fn init(cache_ttl_ms: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        gauge!("gateway_cache_ttl_ms").set(cache_ttl_ms as f64);
        Ok(Self { handle })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
