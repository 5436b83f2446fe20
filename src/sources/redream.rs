//! Redream (Dreamcast) compatibility table: `[flag] [title] [status] [notes]`.

use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver, NAME_ID_TYPE};
use crate::extract::{Extractor, ExtractorConfig, FieldSynonyms};
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{Confidence, SourceInfo, SourceKind};
use crate::types::CandidateRecord;
use serde_json::{Map, Value};

pub const COMPAT_URL: &str = "https://redream.io/compatibility";

pub struct Redream;

impl CompatAdapter for Redream {
    fn id(&self) -> &'static str {
        "redream"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Redream Compatibility".into(),
                kind: SourceKind::Official,
                url: COMPAT_URL.into(),
                hardware_scope: None,
            },
            "dreamcast",
            "redream",
            NAME_ID_TYPE,
            IdConvention::Verbatim,
        )
        .with_confidence(Confidence::High)
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("playable", CompatStatus::Playable)
                .label("starts", CompatStatus::Ingame)
                .label("menus", CompatStatus::Intro)
                .label("broken", CompatStatus::Broken)
                .labels(&["unknown", "untested"], CompatStatus::Unknown),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(RedreamResolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), NAME_ID_TYPE),
        })
    }

    fn extractor(&self) -> Extractor {
        Extractor::new(ExtractorConfig::new(self.id()).positional_columns(&["flag", "title", "status", "notes"]))
    }
}

struct RedreamResolver {
    inner: SynonymResolver,
}

impl FieldResolver for RedreamResolver {
    fn resolve_identity(&self, _candidate: &CandidateRecord) -> Option<Identity> {
        None
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate)
    }

    fn resolve_notes(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_notes(candidate)
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        if let Some(flag) = candidate.text("flag") {
            meta.insert("flag".into(), Value::String(flag));
        }
        Some(meta)
    }
}
