//! Build phase metrics: records emitted, dropped and warned about.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct BuildMetrics;

impl BuildMetrics {
    pub fn record_built(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "build", "records")).increment(count as u64);
    }

    pub fn record_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "build", "dropped")).increment(count as u64);
    }

    pub fn record_warnings(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "build", "malformed_fields"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for BuildMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "build", "records"));
        let _ = counter!(phase_metric!(counter, "build", "dropped"));
        let _ = counter!(phase_metric!(counter, "build", "malformed_fields"));
    }

    fn phase_name() -> &'static str {
        "build"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "build", "records"),
                metric_type: MetricType::Counter,
                help: "Output records built from candidates",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "build", "dropped"),
                metric_type: MetricType::Counter,
                help: "Candidates dropped for lacking an identity",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "build", "malformed_fields"),
                metric_type: MetricType::Counter,
                help: "Sub-fields that were missing or unparseable on kept records",
                labels: vec![],
            },
        ]
    }
}
