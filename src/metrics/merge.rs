//! Merge phase metrics.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct MergeMetrics;

impl MergeMetrics {
    pub fn record_file_merged() {
        ::metrics::counter!(phase_metric!(counter, "merge", "files_merged")).increment(1);
    }

    pub fn record_file_skipped() {
        ::metrics::counter!(phase_metric!(counter, "merge", "files_skipped")).increment(1);
    }

    pub fn record_duplicates_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "merge", "duplicates_dropped"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for MergeMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "merge", "files_merged"));
        let _ = counter!(phase_metric!(counter, "merge", "files_skipped"));
        let _ = counter!(phase_metric!(counter, "merge", "duplicates_dropped"));
    }

    fn phase_name() -> &'static str {
        "merge"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "merge", "files_merged"),
                metric_type: MetricType::Counter,
                help: "Input documents accepted into the merged collection",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "files_skipped"),
                metric_type: MetricType::Counter,
                help: "Input documents skipped for an unknown version or read failure",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "merge", "duplicates_dropped"),
                metric_type: MetricType::Counter,
                help: "Records dropped because an earlier record had the same key",
                labels: vec![],
            },
        ]
    }
}
