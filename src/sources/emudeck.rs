//! EmuDeck community compatibility list (Steam Deck).

use super::layer_c::{CandidateBatch, LayerCAdapter};
use super::IngestContext;
use crate::builder::{PlatformTokens, SynonymResolver};
use crate::error::Result;
use crate::extract::{Extractor, ExtractorConfig, FieldSynonyms, RecordShape};
use crate::schema::{HardwareScope, SourceInfo, SourceKind};
use crate::types::ContentKind;

pub const SOURCE_URL: &str = "https://brantje.github.io/emudeck-compatibility-list/";

pub fn emudeck_platforms() -> PlatformTokens {
    PlatformTokens::new()
        .alias("ps3", &["PlayStation 3"])
        .alias("wiiu", &["Wii U (Cemu)", "Wii U"])
        .alias("switch", &["Nintendo Switch"])
        .alias("ps2", &["PlayStation 2"])
        .alias("3ds", &["Nintendo 3DS"])
        .alias("wii", &[])
        .alias("gamecube", &["GC"])
        .alias("saturn", &["Sega Saturn"])
        .alias("xbox", &["Original Xbox"])
}

pub struct EmuDeck;

impl LayerCAdapter for EmuDeck {
    fn id(&self) -> &'static str {
        "emudeck"
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id().into(),
            name: "EmuDeck Compatibility List".into(),
            kind: SourceKind::Community,
            url: SOURCE_URL.into(),
            hardware_scope: Some(HardwareScope {
                device_family: "Steam Deck".into(),
                chipset: None,
            }),
        }
    }

    fn resolver(&self) -> SynonymResolver {
        SynonymResolver::new(FieldSynonyms::standard(), "name")
    }

    fn platforms(&self) -> PlatformTokens {
        emudeck_platforms()
    }

    /// Embedded state first (records need title, platform and status), then the table.
    fn collect_batches(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateBatch>> {
        let html = ctx.fetch_text(SOURCE_URL)?;
        let extractor = Extractor::new(ExtractorConfig::new(self.id()).shape(RecordShape::default().with_min_groups(3)));
        let extraction = extractor.extract(&html, ContentKind::Html)?;
        Ok(vec![CandidateBatch {
            source_url: SOURCE_URL.into(),
            default_platform: None,
            candidates: extraction.records,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildReport, LayerCBuilder};
    use crate::normalize::{CompatStatus, PerformanceTier, StatusNormalizer};
    use crate::schema::Confidence;
    use crate::sources::layer_c::layer_c_vocabulary;

    #[test]
    fn test_next_data_records_normalize_platforms() {
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">
            {"props": {"pageProps": {"games": [
                {"game": "Persona 5", "platform": "PlayStation 3", "status": "Great"},
                {"game": "Zelda TotK", "platform": "Nintendo Switch", "status": "Poor"},
                {"game": "Halo", "platform": "Original Xbox", "status": "Broken", "notes": "Black screen"},
                {"game": "Panzer Dragoon", "platform": "Sega Saturn", "status": "Playable"}
            ]}}}
        </script></html>"#;
        let extractor = Extractor::new(ExtractorConfig::new("emudeck").shape(RecordShape::default().with_min_groups(3)));
        let extraction = extractor.extract(html, ContentKind::Html).unwrap();
        assert_eq!(extraction.records.len(), 4);

        let normalizer = StatusNormalizer::with_vocabulary(layer_c_vocabulary());
        let resolver = EmuDeck.resolver();
        let platforms = EmuDeck.platforms();
        let builder = LayerCBuilder::new(&normalizer, &resolver, &platforms, SOURCE_URL);
        let mut report = BuildReport::default();
        let items: Vec<_> = extraction
            .records
            .iter()
            .filter_map(|c| builder.build(c, &mut report))
            .collect();

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].platform_id, "ps3");
        assert_eq!(items[0].performance.tier, PerformanceTier::Good);
        assert_eq!(items[1].platform_id, "switch");
        assert_eq!(items[2].platform_id, "xbox");
        assert_eq!(items[2].performance.normalized, CompatStatus::Broken);
        assert_eq!(items[2].settings.get("notes").and_then(|v| v.as_str()), Some("Black screen"));
        assert_eq!(items[3].platform_id, "saturn");
        assert!(items.iter().all(|i| i.confidence == Confidence::Low));
    }
}
