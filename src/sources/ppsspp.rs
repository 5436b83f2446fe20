//! PPSSPP (PSP) community report index.

use super::absolute_url;
use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver, NAME_ID_TYPE};
use crate::extract::FieldSynonyms;
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::{value_to_text, CandidateRecord};

pub const BASE_URL: &str = "https://report.ppsspp.org";
pub const GAMES_URL: &str = "https://report.ppsspp.org/games";

/// Status labels as the report site prints them.
const STATUS_LABELS: &[&str] = &[
    "Perfect",
    "Playable",
    "Ingame",
    "Menu/Intro",
    "Doesn't Boot",
    "Broken",
    "Unknown",
];

pub struct Ppsspp;

impl CompatAdapter for Ppsspp {
    fn id(&self) -> &'static str {
        "ppsspp"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "PPSSPP Community Reports".into(),
                kind: SourceKind::Community,
                url: GAMES_URL.into(),
                hardware_scope: None,
            },
            "psp",
            "ppsspp-standalone",
            NAME_ID_TYPE,
            IdConvention::Verbatim,
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("perfect", CompatStatus::Perfect)
                .label("playable", CompatStatus::Playable)
                .label("ingame", CompatStatus::Ingame)
                .label("menu/intro", CompatStatus::Intro)
                .labels(&["doesn't boot", "broken"], CompatStatus::Broken)
                .label("unknown", CompatStatus::Unknown),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(PpssppResolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), NAME_ID_TYPE),
        })
    }
}

struct PpssppResolver {
    inner: SynonymResolver,
}

impl FieldResolver for PpssppResolver {
    fn resolve_identity(&self, _candidate: &CandidateRecord) -> Option<Identity> {
        None
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    /// A named status column, else the first cell holding a known label.
    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate).or_else(|| {
            candidate
                .fields
                .iter()
                .filter(|(k, _)| !k.starts_with('_'))
                .filter_map(|(_, v)| value_to_text(v))
                .find(|text| STATUS_LABELS.contains(&text.as_str()))
        })
    }

    fn resolve_detail_url(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate
            .text("_link")
            .filter(|l| l.contains("/game/"))
            .map(|l| absolute_url(BASE_URL, &l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_found_in_any_cell() {
        let c = CandidateRecord::from_value(
            "table[0].tr[1]",
            &json!({"title": "Patapon", "col1": "ULUS10077", "col2": "Menu/Intro", "_link": "/game/ULUS10077"}),
        )
        .unwrap();
        let resolver = Ppsspp.resolver();
        assert_eq!(resolver.resolve_status(&c).as_deref(), Some("Menu/Intro"));
        assert_eq!(Ppsspp.normalizer().status("Menu/Intro"), CompatStatus::Intro);
        assert_eq!(
            resolver.resolve_detail_url(&c).as_deref(),
            Some("https://report.ppsspp.org/game/ULUS10077")
        );
    }
}
