//! Registration of every phase's metrics, with conflict detection.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Register all metrics from all phases
pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::fetch::FetchMetrics>(&mut all_metrics);
    register_phase_metrics::<super::extract::ExtractMetrics>(&mut all_metrics);
    register_phase_metrics::<super::build::BuildMetrics>(&mut all_metrics);
    register_phase_metrics::<super::merge::MergeMetrics>(&mut all_metrics);

    info!(
        "Registered {} total metrics across all phases",
        all_metrics.len()
    );
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<String, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        let owner = extract_phase_from_metric_name(doc.name);
        if owner != phase_name {
            warn!(
                "Metric '{}' registered by phase '{}' but named for phase '{}'",
                doc.name, phase_name, owner
            );
        }
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' registered again by phase '{}'",
                doc.name, phase_name
            );
        } else {
            debug!(
                "metric {} ({:?}, labels {:?}): {}",
                doc.name, doc.metric_type, doc.labels, doc.help
            );
            all_metrics.insert(doc.name.to_string(), doc);
        }
    }
}

/// Extract phase name from metric name (e.g., "compat_fetch_cache_hits_total" -> "fetch")
pub fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("compat_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{BuildMetrics, ExtractMetrics, FetchMetrics, MergeMetrics};
    use std::collections::HashSet;

    #[test]
    fn test_extract_phase_from_metric_name() {
        assert_eq!(
            extract_phase_from_metric_name("compat_fetch_cache_hits_total"),
            "fetch"
        );
        assert_eq!(
            extract_phase_from_metric_name("compat_merge_duplicates_dropped_total"),
            "merge"
        );
        assert_eq!(extract_phase_from_metric_name("invalid_metric_name"), "unknown");
    }

    #[test]
    fn test_metric_names_are_unique_and_prefixed_by_phase() {
        let mut seen = HashSet::new();
        let phases = [
            (FetchMetrics::phase_name(), FetchMetrics::metrics_documentation()),
            (ExtractMetrics::phase_name(), ExtractMetrics::metrics_documentation()),
            (BuildMetrics::phase_name(), BuildMetrics::metrics_documentation()),
            (MergeMetrics::phase_name(), MergeMetrics::metrics_documentation()),
        ];
        for (phase, docs) in phases {
            for doc in docs {
                assert_eq!(extract_phase_from_metric_name(doc.name), phase);
                assert!(seen.insert(doc.name), "duplicate metric {}", doc.name);
            }
        }
    }
}
