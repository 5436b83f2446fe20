mod common;

use chrono::{TimeZone, Utc};
use common::compile_schema;
use compat_ingest::error::IngestError;
use compat_ingest::merge::{discover_inputs, merge_files};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn record(platform: &str, id: &str, status: &str) -> Value {
    json!({
        "platformId": platform,
        "emulatorId": "emu",
        "externalIdType": "serial",
        "externalGameId": id,
        "gameId": "UNMAPPED",
        "status": {"raw": status, "normalized": status},
        "confidence": "high",
        "source": {"id": "s", "name": "S", "kind": "official", "url": "https://s.test"},
        "generatedAt": "2024-10-01T00:00:00Z"
    })
}

fn write(dir: &Path, name: &str, doc: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(doc).unwrap()).unwrap();
}

#[test]
fn first_seen_record_wins_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "compat.a.json",
        &json!({"schemaVersion": "compat-source-v1", "records": [record("ps2", "SLUS-20312", "playable")]}),
    );
    write(
        dir.path(),
        "compat.b.json",
        &json!({"schemaVersion": "compat-source-v1", "records": [
            record("ps2", "SLUS-20312", "broken"),
            record("ps2", "SLUS-20946", "perfect")
        ]}),
    );

    let inputs = discover_inputs(dir.path()).unwrap();
    let generated_at = Utc.with_ymd_and_hms(2024, 10, 2, 12, 0, 0).unwrap();
    let (merged, report) = merge_files(&inputs, generated_at).unwrap();

    assert_eq!(merged.items.len(), 2);
    assert_eq!(merged.items[0]["status"]["normalized"], "playable");
    assert_eq!(merged.items[1]["externalGameId"], "SLUS-20946");
    assert_eq!(merged.sources, vec!["compat.a.json", "compat.b.json"]);
    assert_eq!(report.files_merged, 2);
    assert_eq!(report.duplicates_dropped, 1);

    let value = serde_json::to_value(&merged).unwrap();
    assert_eq!(value["generatedAt"], "2024-10-02T12:00:00Z");
    let schema = compile_schema(include_str!("../schemas/merged.json"));
    assert!(schema.is_valid(&value));
}

#[test]
fn unknown_version_and_unreadable_inputs_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "compat.a.json",
        &json!({"schemaVersion": "compat-source-v1", "records": [record("ps3", "BLUS30443", "ingame")]}),
    );
    write(
        dir.path(),
        "compat.b.json",
        &json!({"schemaVersion": "compat-source-v9", "records": [record("ps3", "BLUS30001", "ingame")]}),
    );
    fs::write(dir.path().join("compat.c.json"), "{not json").unwrap();
    // Legacy `version` / `items` keys are still understood
    write(
        dir.path(),
        "compat.d.json",
        &json!({"version": "compat-source-v1", "items": [record("ps3", "BLUS30002", "boot")]}),
    );

    let inputs = discover_inputs(dir.path()).unwrap();
    let (merged, report) = merge_files(&inputs, Utc::now()).unwrap();

    assert_eq!(merged.items.len(), 2);
    assert_eq!(report.files_merged, 2);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped[0].path.ends_with("compat.b.json"));
    assert!(report.skipped[1].path.ends_with("compat.c.json"));
}

#[test]
fn records_missing_a_key_field_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut partial = record("wii", "RMGE01", "perfect");
    partial.as_object_mut().unwrap().remove("externalIdType");
    write(
        dir.path(),
        "compat.a.json",
        &json!({"schemaVersion": "compat-source-v1", "records": [partial, record("wii", "SB4E01", "playable")]}),
    );

    let inputs = discover_inputs(dir.path()).unwrap();
    let (merged, report) = merge_files(&inputs, Utc::now()).unwrap();

    assert_eq!(merged.items.len(), 1);
    assert_eq!(report.malformed.len(), 1);
    assert_eq!(report.malformed[0].field, "mergeKey");
}

#[test]
fn discovery_ignores_other_outputs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("compat.x.json"), "{}").unwrap();
    fs::write(dir.path().join("settings.pcsx2-gameindex.json"), "{}").unwrap();
    fs::write(dir.path().join("layerC.emudeck.json"), "{}").unwrap();
    fs::write(dir.path().join("compat.notes.txt"), "").unwrap();

    let inputs = discover_inputs(dir.path()).unwrap();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].ends_with("compat.x.json"));
}

#[test]
fn directory_without_compat_files_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("settings.pcsx2-gameindex.json"), "{}").unwrap();

    let err = discover_inputs(dir.path()).unwrap_err();
    assert!(matches!(err, IngestError::NoMergeInputs(_)));
    assert!(err.to_string().contains("compat.*.json"));
    assert!(matches!(merge_files(&[], Utc::now()), Err(IngestError::NoMergeInputs(_))));
}
