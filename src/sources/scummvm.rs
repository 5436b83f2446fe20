//! ScummVM compatibility page, published as prose lines `<title> <engine:gameid> <level>`.

use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver};
use crate::extract::{Extractor, ExtractorConfig, FieldSynonyms, StrategyKind};
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const COMPAT_URL: &str = "https://scummvm.org/compatibility/";
pub const ID_TYPE: &str = "scummvm-id";

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<title>.+?)\s+(?P<id>[A-Za-z0-9_\-]+:[A-Za-z0-9_\-]+)\s+(?P<status>Untested|Broken|Bugged|Good|Excellent)\s*$",
    )
    .expect("valid regex")
});

pub struct ScummVm;

impl CompatAdapter for ScummVm {
    fn id(&self) -> &'static str {
        "scummvm"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "ScummVM Compatibility".into(),
                kind: SourceKind::Official,
                url: COMPAT_URL.into(),
                hardware_scope: None,
            },
            "scummvm",
            "scummvm-standalone",
            ID_TYPE,
            IdConvention::Verbatim,
        )
    }

    /// Support levels are coarse; both good levels mean playable.
    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .labels(&["excellent", "good"], CompatStatus::Playable)
                .label("bugged", CompatStatus::Ingame)
                .label("broken", CompatStatus::Broken)
                .label("untested", CompatStatus::Unknown),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(ScummVmResolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), ID_TYPE),
        })
    }

    fn extractor(&self) -> Extractor {
        Extractor::new(
            ExtractorConfig::new(self.id())
                .line_pattern(LINE_PATTERN.clone())
                .strategies(&[StrategyKind::Lines]),
        )
    }
}

struct ScummVmResolver {
    inner: SynonymResolver,
}

impl FieldResolver for ScummVmResolver {
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        self.inner.resolve_identity(candidate)
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate)
    }

    fn resolve_notes(&self, candidate: &CandidateRecord) -> Option<String> {
        self.resolve_status(candidate)
            .map(|level| format!("ScummVM support level: {level}"))
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let level = self.resolve_status(candidate)?;
        let mut meta = Map::new();
        meta.insert("supportLevel".into(), Value::String(level));
        Some(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildReport, RecordBuilder};
    use crate::types::ContentKind;
    use chrono::Utc;

    #[test]
    fn test_lines_become_records() {
        let html = "<html><body><p>Compatibility</p><p>Day of the Tentacle scumm:tentacle Excellent</p>\
                    <p>Some Game engine:some-game Bugged</p><p>footer text</p></body></html>";
        let adapter = ScummVm;
        let extraction = adapter.extractor().extract(html, ContentKind::Html).unwrap();
        assert_eq!(extraction.strategy, StrategyKind::Lines);

        let descriptor = adapter.descriptor();
        let normalizer = adapter.normalizer();
        let resolver = adapter.resolver();
        let builder = RecordBuilder::new(&descriptor, &normalizer, resolver.as_ref(), Utc::now());
        let mut report = BuildReport::default();
        let records = builder.build_all(&extraction.records, &mut report);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_game_id, "scumm:tentacle");
        assert_eq!(records[0].external_id_type, ID_TYPE);
        assert_eq!(records[0].status.normalized, CompatStatus::Playable);
        assert_eq!(records[1].status.normalized, CompatStatus::Ingame);
        assert_eq!(
            records[1].meta.as_ref().and_then(|m| m.get("supportLevel")),
            Some(&Value::String("Bugged".into()))
        );
    }
}
