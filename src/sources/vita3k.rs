//! Vita3K (PS Vita) compatibility database, published as an asset on the `compat_db` release.
//!
//! The asset is either plain JSON or a zip holding it; the release metadata says which.

use super::compat::CompatAdapter;
use super::IngestContext;
use crate::builder::{FieldResolver, IdConvention, SourceDescriptor, SynonymResolver};
use crate::error::{IngestError, Result};
use crate::extract::archive::read_entries;
use crate::extract::{CanonicalField, FieldSynonyms};
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::{CandidateRecord, ContentKind};
use serde_json::Value;
use tracing::info;

pub const REPO_URL: &str = "https://github.com/Vita3K/compatibility";
pub const RELEASE_API: &str = "https://api.github.com/repos/Vita3K/compatibility/releases/tags/compat_db";
pub const ID_TYPE: &str = "title_id";

/// A downloadable file attached to the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

impl ReleaseAsset {
    fn is_zip(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".zip")
    }
}

/// Prefers a `.json` asset, then a `.zip`, then whatever comes first.
pub fn pick_asset(release: &Value) -> Option<ReleaseAsset> {
    let assets: Vec<ReleaseAsset> = release
        .get("assets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|a| {
            Some(ReleaseAsset {
                name: a.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                url: a.get("browser_download_url")?.as_str()?.to_string(),
            })
        })
        .collect();
    [".json", ".zip"]
        .iter()
        .find_map(|ext| {
            assets
                .iter()
                .find(|a| a.name.to_ascii_lowercase().ends_with(ext))
                .cloned()
        })
        .or_else(|| assets.first().cloned())
}

/// The database text: the asset itself, or the first `.json` file inside a zip asset.
pub fn database_text(asset: &ReleaseAsset, body: &[u8]) -> Result<String> {
    if !asset.is_zip() {
        let text = String::from_utf8_lossy(body);
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string());
    }
    read_entries(body, |name| name.to_ascii_lowercase().ends_with(".json"))?
        .into_iter()
        .next()
        .map(|entry| entry.text())
        .ok_or_else(|| IngestError::ZeroRecords {
            context: asset.name.clone(),
            tried: "no .json file inside the archive".into(),
        })
}

fn synonyms() -> FieldSynonyms {
    FieldSynonyms::standard()
        .with(CanonicalField::Id, &["title_id", "titleid", "tid", "id"])
        .with(CanonicalField::Title, &["name", "title", "game"])
        .with(CanonicalField::Status, &["status", "state", "compat"])
}

pub struct Vita3k;

impl CompatAdapter for Vita3k {
    fn id(&self) -> &'static str {
        "vita3k"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Vita3K Compatibility DB".into(),
                kind: SourceKind::Official,
                url: REPO_URL.into(),
                hardware_scope: None,
            },
            "psvita",
            "vita3k",
            ID_TYPE,
            IdConvention::ProductCode { len: 9 },
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .labels(&["perfect"], CompatStatus::Perfect)
                .labels(&["playable"], CompatStatus::Playable)
                .labels(&["ingame", "in game", "in-game"], CompatStatus::Ingame)
                .labels(&["intro", "menu", "menus"], CompatStatus::Intro)
                .labels(&["boots", "boot", "loadable", "loads"], CompatStatus::Boot)
                .labels(&["nothing", "broken", "crash", "unplayable"], CompatStatus::Broken),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(SynonymResolver::new(synonyms(), ID_TYPE))
    }

    fn content_kind(&self) -> ContentKind {
        ContentKind::Json
    }

    fn fetch_url(&self) -> String {
        RELEASE_API.to_string()
    }

    fn collect_candidates(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateRecord>> {
        let release: Value = serde_json::from_str(&ctx.fetch_text(RELEASE_API)?)?;
        let asset = pick_asset(&release).ok_or_else(|| IngestError::ZeroRecords {
            context: RELEASE_API.to_string(),
            tried: "release has no downloadable assets".into(),
        })?;
        info!(asset = %asset.name, "Vita3K compat asset");
        let body = ctx.fetch_bytes(&asset.url)?;
        let text = database_text(&asset, &body)?;
        Ok(self.extractor().extract(&text, ContentKind::Json)?.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::archive::tests::zip_of;
    use serde_json::json;

    #[test]
    fn test_asset_preference() {
        let release = json!({"assets": [
            {"name": "app_compat_db.xml", "browser_download_url": "https://dl/xml"},
            {"name": "compat.zip", "browser_download_url": "https://dl/zip"},
            {"name": "compat.json", "browser_download_url": "https://dl/json"}
        ]});
        assert_eq!(pick_asset(&release).unwrap().url, "https://dl/json");

        let zipped = json!({"assets": [
            {"name": "notes.txt", "browser_download_url": "https://dl/txt"},
            {"name": "compat.ZIP", "browser_download_url": "https://dl/zip"}
        ]});
        assert_eq!(pick_asset(&zipped).unwrap().name, "compat.ZIP");

        let other = json!({"assets": [{"name": "db.bin", "browser_download_url": "https://dl/bin"}]});
        assert_eq!(pick_asset(&other).unwrap().name, "db.bin");
        assert!(pick_asset(&json!({"assets": []})).is_none());
    }

    #[test]
    fn test_database_inside_zip() {
        let asset = ReleaseAsset {
            name: "compat.zip".into(),
            url: "https://dl/zip".into(),
        };
        let bytes = zip_of(&[("README.txt", "hi"), ("db/compat.json", "[]")]);
        assert_eq!(database_text(&asset, &bytes).unwrap(), "[]");

        let empty = zip_of(&[("README.txt", "hi")]);
        assert!(matches!(database_text(&asset, &empty), Err(IngestError::ZeroRecords { .. })));
    }

    #[test]
    fn test_keyed_database_uses_key_as_title_id() {
        let db = json!({
            "PCSE00001": {"name": "Uncharted: Golden Abyss", "status": "Playable"},
            "PCSB00245": {"name": "Persona 4 Golden", "status": "Ingame"}
        });
        let extraction = Vita3k.extractor().extract(&db.to_string(), ContentKind::Json).unwrap();
        let resolver = Vita3k.resolver();
        let first = resolver.resolve_identity(&extraction.records[0]).unwrap();
        assert_eq!(first.value, "PCSE00001");
        assert_eq!(Vita3k.normalizer().status("Ingame"), CompatStatus::Ingame);
        assert_eq!(Vita3k.normalizer().status("Nothing"), CompatStatus::Broken);
    }
}
