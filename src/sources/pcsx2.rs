//! PCSX2 (PS2) compatibility page: embedded JSON when present, otherwise the HTML table.

use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, SourceDescriptor, SynonymResolver};
use crate::extract::{CanonicalField, FieldSynonyms};
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};

pub const COMPAT_URL: &str = "https://pcsx2.net/compat/";

pub struct Pcsx2;

impl CompatAdapter for Pcsx2 {
    fn id(&self) -> &'static str {
        "pcsx2"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "PCSX2 Compatibility".into(),
                kind: SourceKind::Official,
                url: COMPAT_URL.into(),
                hardware_scope: None,
            },
            "ps2",
            "pcsx2",
            "serial",
            IdConvention::Serial { dashed: true },
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("perfect", CompatStatus::Perfect)
                .label("playable", CompatStatus::Playable)
                .labels(&["in-game", "ingame"], CompatStatus::Ingame)
                .labels(&["intro", "menu"], CompatStatus::Intro)
                .labels(&["boots", "boot"], CompatStatus::Boot)
                .labels(&["broken", "unplayable"], CompatStatus::Broken),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        let synonyms = FieldSynonyms::standard()
            .with(CanonicalField::Id, &["serial", "slus", "sles", "game id", "id"]);
        Box::new(SynonymResolver::new(synonyms, "serial"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildReport, RecordBuilder};
    use crate::extract::StrategyKind;
    use crate::types::ContentKind;
    use chrono::Utc;

    #[test]
    fn test_embedded_payload_wins_over_table() {
        let html = r#"<html><script>window.__COMPAT__ = {"games": [
            {"title": "Shadow of the Colossus", "serial": "SCUS_974.72", "status": "Playable"},
            {"title": "Jak II", "serial": "SCUS-97265", "status": "Perfect"},
            {"title": "Odd Demo", "serial": "demo", "status": "Menu"}
        ]};</script>
        <table><tr><th>Title</th><th>Status</th></tr><tr><td>Other</td><td>Broken</td></tr></table></html>"#;
        let adapter = Pcsx2;
        let extraction = adapter.extractor().extract(html, ContentKind::Html).unwrap();
        assert_eq!(extraction.strategy, StrategyKind::StructuredPayload);

        let descriptor = adapter.descriptor();
        let normalizer = adapter.normalizer();
        let resolver = adapter.resolver();
        let builder = RecordBuilder::new(&descriptor, &normalizer, resolver.as_ref(), Utc::now());
        let mut report = BuildReport::default();
        let records = builder.build_all(&extraction.records, &mut report);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].external_game_id, "SCUS-97472");
        assert_eq!(records[1].status.normalized, CompatStatus::Perfect);
        assert_eq!(records[2].external_game_id, "demo");
        assert_eq!(records[2].status.normalized, CompatStatus::Intro);
        assert_eq!(report.warnings.len(), 1);
    }
}
