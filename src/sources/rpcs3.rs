//! RPCS3 (PS3) compatibility export: a JSON object keyed by serial.

use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver};
use crate::extract::FieldSynonyms;
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::{CandidateRecord, ContentKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

pub const EXPORT_URL: &str = "https://rpcs3.net/compatibility?api=v1&export";
pub const PAGE_URL: &str = "https://rpcs3.net/compatibility";
const THREAD_URL: &str = "https://forums.rpcs3.net/thread-";

pub struct Rpcs3;

impl CompatAdapter for Rpcs3 {
    fn id(&self) -> &'static str {
        "rpcs3"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "RPCS3 Compatibility List".into(),
                kind: SourceKind::Official,
                url: PAGE_URL.into(),
                hardware_scope: None,
            },
            "ps3",
            "rpcs3",
            "serial",
            IdConvention::Serial { dashed: false },
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("playable", CompatStatus::Playable)
                .labels(&["ingame", "in-game", "in game"], CompatStatus::Ingame)
                .label("intro", CompatStatus::Intro)
                .label("loadable", CompatStatus::Boot)
                .label("nothing", CompatStatus::Broken),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(Rpcs3Resolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), "serial"),
        })
    }

    fn content_kind(&self) -> ContentKind {
        ContentKind::Json
    }

    fn fetch_url(&self) -> String {
        EXPORT_URL.to_string()
    }
}

struct Rpcs3Resolver {
    inner: SynonymResolver,
}

impl FieldResolver for Rpcs3Resolver {
    /// The export is keyed by serial; an inline serial field is only a fallback.
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        match candidate.text("_key") {
            Some(value) => Some(Identity {
                id_type: "serial".into(),
                value,
            }),
            None => self.inner.resolve_identity(candidate),
        }
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate)
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        if let Some(date) = candidate.get("date").and_then(parse_date) {
            meta.insert("lastTested".into(), Value::String(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(commit) = candidate.text("commit") {
            meta.insert("commit".into(), Value::String(commit));
        }
        if let Some(pr) = candidate.get("pr").filter(|v| v.is_number()) {
            meta.insert("pr".into(), pr.clone());
        }
        Some(meta)
    }

    fn resolve_detail_url(&self, candidate: &CandidateRecord) -> Option<String> {
        let thread = candidate.text("thread")?;
        (thread != "0").then(|| format!("{THREAD_URL}{thread}.html"))
    }
}

/// Unix seconds or one of the date spellings seen in the export.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0).map(|dt| dt.date_naive()),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}
