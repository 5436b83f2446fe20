use crate::constants::output_file_name;
use crate::error::Result;
use crate::sources::{IngestContext, IngestSource, SourceRegistry};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};

/// A source run that wrote its document.
#[derive(Debug, Clone)]
pub struct SourceRun {
    pub source_id: String,
    pub output: PathBuf,
    pub records: usize,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<SourceRun>,
    /// Source id and the error that stopped it
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs one source and writes its document to `out`. Nothing is written on failure.
pub fn run_source(source: &dyn IngestSource, ctx: &IngestContext<'_>, out: &Path) -> Result<SourceRun> {
    let document = source.run(ctx)?;
    document.write_json(out)?;
    info!(
        source = source.source_id(),
        schema = document.schema_version(),
        records = document.record_count(),
        output = %out.display(),
        "wrote output"
    );
    Ok(SourceRun {
        source_id: source.source_id().to_string(),
        output: out.to_path_buf(),
        records: document.record_count(),
    })
}

/// True when `id` should run under an `--only` filter (substring match, empty filter runs all).
pub fn selected(id: &str, only: &[String]) -> bool {
    only.is_empty() || only.iter().any(|s| id.contains(s.trim()))
}

/// Runs every selected source in registry order. A failing source is recorded and the
/// batch moves on.
pub fn run_all(
    registry: &SourceRegistry,
    ctx: &IngestContext<'_>,
    out_dir: &Path,
    only: &[String],
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for source in registry.iter().filter(|s| selected(s.source_id(), only)) {
        let id = source.source_id();
        let span = info_span!("source", source = id);
        let _enter = span.enter();
        let out = out_dir.join(output_file_name(source.schema_version(), id));
        match run_source(source, ctx, &out) {
            Ok(run) => summary.succeeded.push(run),
            Err(e) => {
                error!(source = id, schema_drift = e.is_schema_drift(), "source failed: {}", e);
                summary.failed.push((id.to_string(), e.to_string()));
            }
        }
    }
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "batch complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_filter_matches_substrings() {
        let only = vec!["dolphin".to_string()];
        assert!(selected("dolphin", &only));
        assert!(selected("dolphin-gameini", &only));
        assert!(!selected("rpcs3", &only));
        assert!(selected("rpcs3", &[]));
    }
}
