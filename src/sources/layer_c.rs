//! Shared run logic for device-scoped community performance sources (`layerC-v1`).

use super::{IngestContext, IngestSource};
use crate::builder::{BuildReport, LayerCBuilder, PlatformTokens, SynonymResolver};
use crate::constants::LAYER_C_SCHEMA_VERSION;
use crate::error::{IngestError, Result};
use crate::normalize::{CompatStatus, Normalized, PerformanceTier, StatusNormalizer, Vocabulary};
use crate::schema::{LayerCDocument, OutputDocument, SourceInfo};
use crate::types::CandidateRecord;
use tracing::{info, instrument};

/// Candidates from one page or sheet tab, with what they share.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    pub source_url: String,
    /// Platform for rows that do not name one
    pub default_platform: Option<String>,
    pub candidates: Vec<CandidateRecord>,
}

pub trait LayerCAdapter: Send + Sync {
    fn id(&self) -> &'static str;

    fn source_info(&self) -> SourceInfo;

    fn resolver(&self) -> SynonymResolver;

    fn platforms(&self) -> PlatformTokens;

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(layer_c_vocabulary())
    }

    fn collect_batches(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateBatch>>;
}

pub struct LayerCSource<A>(pub A);

impl<A: LayerCAdapter> IngestSource for LayerCSource<A> {
    fn source_id(&self) -> &'static str {
        self.0.id()
    }

    fn schema_version(&self) -> &'static str {
        LAYER_C_SCHEMA_VERSION
    }

    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        run_layer_c(&self.0, ctx).map(OutputDocument::LayerC)
    }
}

/// Community sheet wording with the device tier each label implies.
pub fn layer_c_vocabulary() -> Vocabulary {
    let tiered = |status, tier| Normalized::new(status, tier);
    Vocabulary::new()
        .label_with_tier("perfect", tiered(CompatStatus::Perfect, PerformanceTier::Excellent))
        .label_with_tier("excellent", tiered(CompatStatus::Perfect, PerformanceTier::Excellent))
        .label_with_tier("flawless", tiered(CompatStatus::Perfect, PerformanceTier::Excellent))
        .label_with_tier("great", tiered(CompatStatus::Playable, PerformanceTier::Good))
        .label_with_tier("good", tiered(CompatStatus::Playable, PerformanceTier::Good))
        .labels(&["playable", "works", "ok", "runs", "minor issues"], CompatStatus::Playable)
        .labels(&["poor", "bad", "major issues"], CompatStatus::Ingame)
        .labels(
            &["unplayable", "broken", "doesn't work", "does not work", "crash", "crashes"],
            CompatStatus::Broken,
        )
}

#[instrument(skip(adapter, ctx), fields(source = adapter.id()))]
pub fn run_layer_c(adapter: &dyn LayerCAdapter, ctx: &IngestContext<'_>) -> Result<LayerCDocument> {
    let info = adapter.source_info();
    let normalizer = adapter.normalizer();
    let resolver = adapter.resolver();
    let platforms = adapter.platforms();
    let mut report = BuildReport::default();
    let mut items = Vec::new();

    for batch in adapter.collect_batches(ctx)? {
        let mut builder = LayerCBuilder::new(&normalizer, &resolver, &platforms, &batch.source_url);
        if let Some(platform) = &batch.default_platform {
            builder = builder.default_platform(platform);
        }
        items.extend(batch.candidates.iter().filter_map(|c| builder.build(c, &mut report)));
    }
    report.finish(adapter.id());
    let items = ctx.options.apply_limit(items);

    if items.is_empty() {
        return Err(IngestError::ZeroRecords {
            context: adapter.id().to_string(),
            tried: "layerC builder over all batches".into(),
        });
    }
    info!(items = items.len(), "layerC source complete");
    Ok(LayerCDocument::new(info, ctx.generated_at, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_c_vocabulary_tiers() {
        let n = StatusNormalizer::with_vocabulary(layer_c_vocabulary());
        assert_eq!(n.normalize("Great").tier, PerformanceTier::Good);
        assert_eq!(n.normalize("Flawless").status, CompatStatus::Perfect);
        assert_eq!(n.normalize("Major Issues").tier, PerformanceTier::Poor);
        assert_eq!(n.normalize("Crashes").status, CompatStatus::Broken);
        // Keyword fallback still applies to free text
        assert_eq!(n.normalize("Playable (minor stutter)").status, CompatStatus::Playable);
    }
}
