//! Azahar (3DS) compatibility list: JSON with a 0..5 score where lower is better.

use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver};
use crate::extract::{CanonicalField, FieldSynonyms};
use crate::normalize::{CompatStatus, NumericScale, StatusNormalizer, Vocabulary};
use crate::schema::{Confidence, SourceInfo, SourceKind};
use crate::types::{CandidateRecord, ContentKind};
use serde_json::{Map, Value};

pub const LIST_URL: &str =
    "https://raw.githubusercontent.com/azahar-emu/compatibility-list/master/compatibility_list.json";
pub const REPO_URL: &str = "https://github.com/azahar-emu/compatibility-list";
pub const ID_TYPE: &str = "3ds-titleid";

/// 99 marks an unrated title.
pub fn score_scale() -> NumericScale {
    NumericScale::new()
        .sentinel(99)
        .band(i64::MIN, 1, CompatStatus::Playable)
        .band(2, 2, CompatStatus::Ingame)
        .band(3, 3, CompatStatus::Intro)
        .band(4, 4, CompatStatus::Boot)
        .band(5, i64::MAX, CompatStatus::Broken)
}

fn synonyms() -> FieldSynonyms {
    FieldSynonyms::standard()
        .with(CanonicalField::Id, &["titleid", "title_id", "title id", "tid", "id"])
        .with(CanonicalField::Title, &["name", "title", "game", "game_name"])
        .with(CanonicalField::Status, &["compatibility", "rating", "score", "status"])
}

pub struct Azahar;

impl CompatAdapter for Azahar {
    fn id(&self) -> &'static str {
        "azahar"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Azahar Compatibility List".into(),
                kind: SourceKind::Community,
                url: REPO_URL.into(),
                hardware_scope: None,
            },
            "3ds",
            "azahar",
            ID_TYPE,
            IdConvention::HexTitleId {
                digits: 16,
                uppercase: false,
            },
        )
        .with_confidence(Confidence::Medium)
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(Vocabulary::new().scale(score_scale()))
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(AzaharResolver {
            inner: SynonymResolver::new(synonyms(), ID_TYPE),
        })
    }

    fn content_kind(&self) -> ContentKind {
        ContentKind::Json
    }

    fn fetch_url(&self) -> String {
        LIST_URL.to_string()
    }

    fn should_skip(&self, candidate: &CandidateRecord) -> Option<String> {
        let resolver = SynonymResolver::new(synonyms(), ID_TYPE);
        resolver
            .resolve_identity(candidate)
            .is_none()
            .then(|| "no title id".to_string())
    }
}

struct AzaharResolver {
    inner: SynonymResolver,
}

impl FieldResolver for AzaharResolver {
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
        self.inner.resolve_notes(candidate)
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let score = self
            .resolve_status(candidate)
            .and_then(|s| s.parse::<i64>().ok())?;
        let mut meta = Map::new();
        meta.insert("score".into(), Value::from(score));
        Some(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildReport, RecordBuilder};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_score_scale() {
        let n = Azahar.normalizer();
        assert_eq!(n.status("0"), CompatStatus::Playable);
        assert_eq!(n.status("1"), CompatStatus::Playable);
        assert_eq!(n.status("2"), CompatStatus::Ingame);
        assert_eq!(n.status("4.0"), CompatStatus::Boot);
        assert_eq!(n.status("5"), CompatStatus::Broken);
        assert_eq!(n.status("99"), CompatStatus::Unknown);
        assert_eq!(n.status(""), CompatStatus::Unknown);
    }

    #[test]
    fn test_title_ids_are_lowercase_hex() {
        let doc = json!([
            {"title_id": "0x0004000000055D00", "name": "Pokemon X", "compatibility": 1},
            {"title_id": "00040000001B5000", "name": "Fire Emblem", "compatibility": 99}
        ]);
        let adapter = Azahar;
        let extraction = adapter.extractor().extract(&doc.to_string(), ContentKind::Json).unwrap();
        let descriptor = adapter.descriptor();
        let normalizer = adapter.normalizer();
        let resolver = adapter.resolver();
        let builder = RecordBuilder::new(&descriptor, &normalizer, resolver.as_ref(), Utc::now());
        let mut report = BuildReport::default();
        let records = builder.build_all(&extraction.records, &mut report);

        assert_eq!(records[0].external_game_id, "0004000000055d00");
        assert_eq!(records[0].confidence, Confidence::Medium);
        assert_eq!(records[1].status.normalized, CompatStatus::Unknown);
        assert_eq!(records[1].meta.as_ref().unwrap().get("score"), Some(&json!(99)));
    }
}
