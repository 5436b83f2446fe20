//! xemu (original Xbox) title metadata from the `xemu-project/xdb` repository snapshot.
//!
//! The snapshot is a zip of the repo; every `titles/<titleid>.json` file is one candidate.

use super::compat::CompatAdapter;
use super::IngestContext;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor};
use crate::error::Result;
use crate::extract::archive::{json_under, read_entries, ArchiveEntry};
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::CandidateRecord;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const REPO_URL: &str = "https://github.com/xemu-project/xdb";
pub const ARCHIVE_URL: &str = "https://github.com/xemu-project/xdb/archive/refs/heads/main.zip";
pub const ID_TYPE: &str = "title_id";
pub const FILE_ID_TYPE: &str = "file_id";

const ID_KEYS: &[&str] = &["titleId", "title_id", "id"];
const TITLE_KEYS: &[&str] = &["title", "name", "game"];
const FILE_STEM: &str = "_file";
const STATUS_HINT: &str = "_status";

fn is_title_id(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Status may sit under `compatibility.{status,state}` or at the top level.
fn status_of(obj: &Map<String, Value>) -> Option<String> {
    let nested = obj.get("compatibility").and_then(Value::as_object);
    nested
        .and_then(|c| c.get("status").or_else(|| c.get("state")))
        .or_else(|| obj.get("status"))
        .or_else(|| obj.get("state"))
        .and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// One candidate per title file; files that are not JSON objects are skipped.
pub fn candidates_from_entries(entries: &[ArchiveEntry]) -> Vec<CandidateRecord> {
    entries
        .iter()
        .filter_map(|entry| {
            let value: Value = match serde_json::from_slice(&entry.content) {
                Ok(v) => v,
                Err(e) => {
                    warn!(file = %entry.name, "skipping unparseable title file: {}", e);
                    return None;
                }
            };
            let mut record = CandidateRecord::from_value(entry.name.clone(), &value)?;
            record.insert(FILE_STEM, entry.stem().to_string());
            if let Some(status) = status_of(&record.fields) {
                record.insert(STATUS_HINT, status);
            }
            Some(record)
        })
        .collect()
}

pub struct Xemu;

impl CompatAdapter for Xemu {
    fn id(&self) -> &'static str {
        "xemu"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "xemu-project/xdb".into(),
                kind: SourceKind::Official,
                url: REPO_URL.into(),
                hardware_scope: None,
            },
            "xbox",
            "xemu",
            ID_TYPE,
            IdConvention::HexTitleId {
                digits: 8,
                uppercase: false,
            },
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .labels(&["perfect"], CompatStatus::Perfect)
                .labels(&["playable"], CompatStatus::Playable)
                .labels(&["ingame", "in-game", "in game"], CompatStatus::Ingame)
                .labels(&["intro", "menu"], CompatStatus::Intro)
                .labels(
                    &["broken", "crash", "won't boot", "wont boot", "unplayable"],
                    CompatStatus::Broken,
                ),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(XemuResolver)
    }

    fn collect_candidates(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateRecord>> {
        let bytes = ctx.fetch_bytes(ARCHIVE_URL)?;
        let entries = read_entries(&bytes, json_under("titles"))?;
        let candidates = candidates_from_entries(&entries);
        info!(files = entries.len(), candidates = candidates.len(), "xdb titles read");
        Ok(candidates)
    }
}

struct XemuResolver;

impl FieldResolver for XemuResolver {
    /// Declared title id, else the file name when it looks like one, else the file name as-is.
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        if let Some(value) = candidate.pick_text(ID_KEYS) {
            return Some(Identity {
                id_type: ID_TYPE.into(),
                value,
            });
        }
        let stem = candidate.text(FILE_STEM)?;
        let id_type = if is_title_id(&stem) { ID_TYPE } else { FILE_ID_TYPE };
        Some(Identity {
            id_type: id_type.into(),
            value: stem,
        })
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.pick_text(TITLE_KEYS)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text(STATUS_HINT)
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let title_id = candidate.pick_text(ID_KEYS).or_else(|| {
            candidate.text(FILE_STEM).filter(|s| is_title_id(s))
        })?;
        let mut meta = Map::new();
        meta.insert("titleId".into(), Value::String(title_id));
        Some(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildReport, RecordBuilder};
    use crate::extract::archive::tests::zip_of;
    use chrono::Utc;

    fn build(files: &[(&str, &str)]) -> Vec<crate::schema::CompatibilityRecord> {
        let bytes = zip_of(files);
        let entries = read_entries(&bytes, json_under("titles")).unwrap();
        let candidates = candidates_from_entries(&entries);
        let descriptor = Xemu.descriptor();
        let normalizer = Xemu.normalizer();
        let resolver = Xemu.resolver();
        let builder = RecordBuilder::new(&descriptor, &normalizer, resolver.as_ref(), Utc::now());
        builder.build_all(&candidates, &mut BuildReport::default())
    }

    #[test]
    fn test_title_files_become_records() {
        let records = build(&[
            ("xdb-main/titles/4D530004.json", r#"{"title": "Halo", "compatibility": {"status": "Playable"}}"#),
            ("xdb-main/titles/4541000d.json", r#"{"name": "Burnout 3", "titleId": "0x4541000D", "status": "Intro"}"#),
            ("xdb-main/titles/homebrew.json", r#"{"title": "Homebrew", "state": "Crash"}"#),
            ("xdb-main/titles/broken.json", "{not json"),
            ("xdb-main/README.json", r#"{"title": "not a title"}"#),
        ]);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].external_game_id, "4d530004");
        assert_eq!(records[0].external_id_type, ID_TYPE);
        assert_eq!(records[0].status.normalized, CompatStatus::Playable);
        assert_eq!(records[0].platform_id, "xbox");

        assert_eq!(records[1].external_game_id, "4541000d");
        assert_eq!(records[1].status.normalized, CompatStatus::Intro);
        assert_eq!(records[1].meta.as_ref().unwrap()["titleId"], "0x4541000D");

        assert_eq!(records[2].external_id_type, FILE_ID_TYPE);
        assert_eq!(records[2].external_game_id, "homebrew");
        assert_eq!(records[2].status.normalized, CompatStatus::Broken);
        assert!(records[2].meta.is_none());
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let records = build(&[("xdb/titles/4d530064.json", r#"{"title": "Halo 2"}"#)]);
        assert_eq!(records[0].status.normalized, CompatStatus::Unknown);
        assert!(records[0].status.raw.is_none());
    }
}
