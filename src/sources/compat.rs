use super::{IngestContext, IngestSource};
use crate::builder::{BuildReport, FieldResolver, RecordBuilder, SourceDescriptor};
use crate::constants::COMPAT_SCHEMA_VERSION;
use crate::error::{IngestError, Result};
use crate::extract::{Extractor, ExtractorConfig};
use crate::normalize::StatusNormalizer;
use crate::schema::{CompatSourceDocument, OutputDocument};
use crate::types::{CandidateRecord, ContentKind};
use tracing::{info, instrument};

/// A source that emits `compat-source-v1` records.
pub trait CompatAdapter: Send + Sync {
    fn id(&self) -> &'static str;

    fn descriptor(&self) -> SourceDescriptor;

    fn normalizer(&self) -> StatusNormalizer;

    fn resolver(&self) -> Box<dyn FieldResolver>;

    fn content_kind(&self) -> ContentKind {
        ContentKind::Html
    }

    fn extractor(&self) -> Extractor {
        Extractor::new(ExtractorConfig::new(self.id()))
    }

    fn fetch_url(&self) -> String {
        self.descriptor().info.url
    }

    /// Fetch plus extraction; paginated sources override this.
    fn collect_candidates(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateRecord>> {
        let text = ctx.fetch_text(&self.fetch_url())?;
        Ok(self.extractor().extract(&text, self.content_kind())?.records)
    }

    /// Determine if a candidate should be skipped before building
    fn should_skip(&self, _candidate: &CandidateRecord) -> Option<String> {
        None
    }
}

/// Adapts a `CompatAdapter` into a registry entry.
pub struct CompatSource<A>(pub A);

impl<A: CompatAdapter> IngestSource for CompatSource<A> {
    fn source_id(&self) -> &'static str {
        self.0.id()
    }

    fn schema_version(&self) -> &'static str {
        COMPAT_SCHEMA_VERSION
    }

    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        run_compat(&self.0, ctx).map(OutputDocument::Compat)
    }
}

/// Collects, builds and guards one compat source run.
///
/// Fails with `ZeroRecords` when nothing survives building, so an upstream
/// layout change never produces an empty but "successful" document.
#[instrument(skip(adapter, ctx), fields(source = adapter.id()))]
pub fn run_compat(adapter: &dyn CompatAdapter, ctx: &IngestContext<'_>) -> Result<CompatSourceDocument> {
    let descriptor = adapter.descriptor();
    let candidates: Vec<CandidateRecord> = adapter
        .collect_candidates(ctx)?
        .into_iter()
        .filter(|c| match adapter.should_skip(c) {
            Some(reason) => {
                tracing::debug!(record_path = %c.record_path, reason = %reason, "skipping candidate");
                false
            }
            None => true,
        })
        .collect();
    let candidates = ctx.options.apply_limit(candidates);

    let normalizer = adapter.normalizer();
    let resolver = adapter.resolver();
    let builder = RecordBuilder::new(&descriptor, &normalizer, resolver.as_ref(), ctx.generated_at);
    let mut report = BuildReport::default();
    let records = builder.build_all(&candidates, &mut report);
    report.finish(adapter.id());

    if records.is_empty() {
        return Err(IngestError::ZeroRecords {
            context: adapter.id().to_string(),
            tried: format!("record builder over {} candidates", candidates.len()),
        });
    }
    info!(records = records.len(), "compat source complete");
    Ok(CompatSourceDocument::new(descriptor.info, ctx.generated_at, records))
}
