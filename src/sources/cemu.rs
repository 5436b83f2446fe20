//! Cemu (Wii U) community compatibility tracker. Status is usually an icon.

use super::absolute_url;
use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver, NAME_ID_TYPE};
use crate::extract::FieldSynonyms;
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const BASE_URL: &str = "https://compat.cemu.info";

static STATUS_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Perfect|Playable|Runs|Loads|Intro|Crash|Unplayable)\b").expect("valid regex")
});
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(v\d+(?:\.\d+){1,3})\b").expect("valid regex"));
static REGION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(USA|EUR|JPN|JAP|PAL|NTSC)\b").expect("valid regex"));

pub struct Cemu;

impl CompatAdapter for Cemu {
    fn id(&self) -> &'static str {
        "cemu"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Cemu Compatibility List".into(),
                kind: SourceKind::Community,
                url: format!("{BASE_URL}/"),
                hardware_scope: None,
            },
            "wiiu",
            "cemu",
            NAME_ID_TYPE,
            IdConvention::Verbatim,
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("perfect", CompatStatus::Perfect)
                .labels(&["playable", "runs"], CompatStatus::Playable)
                .labels(&["loads", "boot"], CompatStatus::Boot)
                .label("intro", CompatStatus::Intro)
                .labels(&["crash", "unplayable", "broken"], CompatStatus::Broken),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(CemuResolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), NAME_ID_TYPE),
        })
    }
}

struct CemuResolver {
    inner: SynonymResolver,
}

impl FieldResolver for CemuResolver {
    /// Rows carry no stable id; the title is the identity.
    fn resolve_identity(&self, _candidate: &CandidateRecord) -> Option<Identity> {
        None
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate).or_else(|| {
            let row = candidate.text("_row_text")?;
            STATUS_WORD.captures(&row).map(|c| c[1].to_string())
        })
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let row = candidate.text("_row_text")?;
        let mut meta = Map::new();
        if let Some(c) = VERSION.captures(&row) {
            meta.insert("version".into(), Value::String(c[1].to_string()));
        }
        if let Some(c) = REGION.captures(&row) {
            let region = c[1].to_ascii_uppercase().replace("JAP", "JPN");
            meta.insert("region".into(), Value::String(region));
        }
        Some(meta)
    }

    fn resolve_detail_url(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text("_link").map(|l| absolute_url(BASE_URL, &l))
    }
}
