//! Extract phase metrics.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ExtractMetrics;

impl ExtractMetrics {
    /// A strategy produced a plausible record set
    pub fn record_strategy_success(strategy: &'static str, records: usize) {
        ::metrics::counter!(phase_metric!(counter, "extract", "strategy_success"), "strategy" => strategy)
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "extract", "candidates"))
            .record(records as f64);
    }

    /// A strategy ran but its result was rejected; the next one is tried
    pub fn record_strategy_fallthrough(strategy: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "extract", "strategy_fallthrough"), "strategy" => strategy)
            .increment(1);
    }

    pub fn record_zero_records() {
        ::metrics::counter!(phase_metric!(counter, "extract", "zero_records")).increment(1);
    }
}

impl PhaseMetrics for ExtractMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "extract", "strategy_success"));
        let _ = counter!(phase_metric!(counter, "extract", "strategy_fallthrough"));
        let _ = counter!(phase_metric!(counter, "extract", "zero_records"));
        let _ = histogram!(phase_metric!(histogram, "extract", "candidates"));
    }

    fn phase_name() -> &'static str {
        "extract"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "extract", "strategy_success"),
                metric_type: MetricType::Counter,
                help: "Extractions won by each strategy",
                labels: vec!["strategy"],
            },
            MetricDoc {
                name: phase_metric!(counter, "extract", "strategy_fallthrough"),
                metric_type: MetricType::Counter,
                help: "Strategies that ran without a plausible result",
                labels: vec!["strategy"],
            },
            MetricDoc {
                name: phase_metric!(counter, "extract", "zero_records"),
                metric_type: MetricType::Counter,
                help: "Documents where every strategy came up empty",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "extract", "candidates"),
                metric_type: MetricType::Histogram,
                help: "Candidate records produced per successful extraction",
                labels: vec![],
            },
        ]
    }
}
