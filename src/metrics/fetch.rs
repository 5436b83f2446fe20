//! Fetch phase metrics: cache behavior, network attempts and retries.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct FetchMetrics;

impl FetchMetrics {
    pub fn record_cache_hit() {
        ::metrics::counter!(phase_metric!(counter, "fetch", "cache_hits")).increment(1);
    }

    /// A stale entry was revalidated by the server (HTTP 304)
    pub fn record_not_modified() {
        ::metrics::counter!(phase_metric!(counter, "fetch", "not_modified")).increment(1);
    }

    pub fn record_request(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "fetch", "requests")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "fetch", "request_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_retry() {
        ::metrics::counter!(phase_metric!(counter, "fetch", "retries")).increment(1);
    }

    pub fn record_success(payload_bytes: usize) {
        ::metrics::counter!(phase_metric!(counter, "fetch", "success")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "fetch", "payload_bytes"))
            .record(payload_bytes as f64);
    }

    pub fn record_failure() {
        ::metrics::counter!(phase_metric!(counter, "fetch", "failures")).increment(1);
    }
}

impl PhaseMetrics for FetchMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "fetch", "cache_hits"));
        let _ = counter!(phase_metric!(counter, "fetch", "not_modified"));
        let _ = counter!(phase_metric!(counter, "fetch", "requests"));
        let _ = counter!(phase_metric!(counter, "fetch", "retries"));
        let _ = counter!(phase_metric!(counter, "fetch", "success"));
        let _ = counter!(phase_metric!(counter, "fetch", "failures"));
        let _ = histogram!(phase_metric!(histogram, "fetch", "request_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "fetch", "payload_bytes"));
    }

    fn phase_name() -> &'static str {
        "fetch"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "fetch", "cache_hits"),
                metric_type: MetricType::Counter,
                help: "Fetches served from a fresh cache entry without network access",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "not_modified"),
                metric_type: MetricType::Counter,
                help: "Stale cache entries revalidated by a 304 response",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "requests"),
                metric_type: MetricType::Counter,
                help: "Network requests issued, including retries",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "retries"),
                metric_type: MetricType::Counter,
                help: "Attempts retried after a transient failure",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "success"),
                metric_type: MetricType::Counter,
                help: "Fetches that produced fresh content from the network",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "failures"),
                metric_type: MetricType::Counter,
                help: "Fetches that failed after exhausting retries",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "fetch", "request_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Duration of a single network attempt in seconds",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "fetch", "payload_bytes"),
                metric_type: MetricType::Histogram,
                help: "Size of fetched payloads in bytes",
                labels: vec![],
            },
        ]
    }
}
