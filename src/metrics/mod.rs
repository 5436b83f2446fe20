//! Phase-organized metrics for the ingestion pipeline
//!
//! Each phase (fetch, extract, build, merge) owns its metric names in a dedicated
//! submodule. Runs are short-lived, so the recorder is installed without an HTTP
//! listener and the snapshot is rendered in-process at the end of a command.

pub mod build;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod registry;

pub use build::BuildMetrics;
pub use extract::ExtractMetrics;
pub use fetch::FetchMetrics;
pub use merge::MergeMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the global metrics recorder
///
/// Idempotent. Installs a Prometheus recorder and registers every phase's metrics
/// so they show up in the rendered snapshot before first use.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("metrics: recorder handle was already stored");
            }
            registry::register_all_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Render the current snapshot in Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Write the snapshot to a textfile (node-exporter textfile collector style).
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let Some(body) = render() else {
        warn!("metrics: no recorder installed, skipping {}", path.display());
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, body)?;
    info!("metrics snapshot written to {}", path.display());
    Ok(())
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Register all metrics for this phase
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Builds metric names following `compat_{phase}_{name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("compat_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("compat_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
