//! Merge of per-source `compat.*.json` documents into one collection.
//!
//! Inputs are read in sorted path order and deduplicated by
//! `(platformId, emulatorId, externalIdType, externalGameId)`; the first record seen wins.
//! Documents with an unrecognized schema version are skipped and reported.

use crate::constants::{COMPAT_FILE_PREFIX, COMPAT_SCHEMA_VERSION, JSON_SUFFIX, MERGED_VERSION};
use crate::error::{IngestError, MalformedFieldWarning, Result};
use crate::metrics::MergeMetrics;
use crate::schema::serialize_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub type MergeKey = (String, String, String, String);

const KEY_FIELDS: [&str; 4] = ["platformId", "emulatorId", "externalIdType", "externalGameId"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedCollection {
    pub version: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    /// File names of the documents that contributed records
    pub sources: Vec<String>,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub files_merged: usize,
    pub skipped: Vec<SkippedInput>,
    pub duplicates_dropped: usize,
    pub malformed: Vec<MalformedFieldWarning>,
}

/// `compat.*.json` files directly under `dir`, sorted by path. Finding none is an error.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(COMPAT_FILE_PREFIX) && n.ends_with(JSON_SUFFIX))
        })
        .collect();
    if paths.is_empty() {
        return Err(IngestError::NoMergeInputs(format!("none in {}", dir.display())));
    }
    paths.sort();
    Ok(paths)
}

/// Schema version under `schemaVersion`, or the older `version` key.
pub fn document_version(doc: &Value) -> Option<&str> {
    doc.get("schemaVersion")
        .or_else(|| doc.get("version"))
        .and_then(Value::as_str)
}

/// Records under `records`, or the older `items` key.
fn document_records(doc: &Value) -> &[Value] {
    doc.get("records")
        .or_else(|| doc.get("items"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn check_version(path: &Path, doc: &Value) -> Result<()> {
    match document_version(doc) {
        Some(COMPAT_SCHEMA_VERSION) => Ok(()),
        found => Err(IngestError::UnknownSchemaVersion {
            path: path.to_path_buf(),
            found: found.map(str::to_string),
        }),
    }
}

pub fn merge_key(record: &Value) -> Option<MergeKey> {
    let part = |k: &str| -> Option<String> {
        match record.get(k)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };
    Some((
        part(KEY_FIELDS[0])?,
        part(KEY_FIELDS[1])?,
        part(KEY_FIELDS[2])?,
        part(KEY_FIELDS[3])?,
    ))
}

fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(text.trim_start_matches('\u{feff}'))?)
}

/// Merges the given documents in the order given. Unreadable or unknown-version inputs are
/// skipped; an empty input list is an error.
pub fn merge_files(paths: &[PathBuf], generated_at: DateTime<Utc>) -> Result<(MergedCollection, MergeReport)> {
    if paths.is_empty() {
        return Err(IngestError::NoMergeInputs("empty input list".into()));
    }
    let mut report = MergeReport::default();
    let mut seen: HashSet<MergeKey> = HashSet::new();
    let mut items = Vec::new();
    let mut sources = Vec::new();

    for path in paths {
        let doc = match read_document(path).and_then(|doc| check_version(path, &doc).map(|_| doc)) {
            Ok(doc) => doc,
            Err(e) => {
                MergeMetrics::record_file_skipped();
                warn!("skipping {}: {}", path.display(), e);
                report.skipped.push(SkippedInput {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let before = items.len();
        for (i, record) in document_records(&doc).iter().enumerate() {
            let Some(key) = merge_key(record) else {
                report.malformed.push(MalformedFieldWarning::new(
                    format!("{}#records[{i}]", path.display()),
                    "mergeKey",
                    "record lacks one of platformId/emulatorId/externalIdType/externalGameId",
                ));
                continue;
            };
            if seen.insert(key) {
                items.push(record.clone());
            } else {
                report.duplicates_dropped += 1;
            }
        }

        MergeMetrics::record_file_merged();
        report.files_merged += 1;
        sources.push(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        );
        info!(file = %path.display(), added = items.len() - before, "merged");
    }

    MergeMetrics::record_duplicates_dropped(report.duplicates_dropped);
    Ok((
        MergedCollection {
            version: MERGED_VERSION.to_string(),
            generated_at,
            sources,
            items,
        },
        report,
    ))
}
