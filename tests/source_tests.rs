mod common;

use common::{compile_schema, fetcher, html, zip_of, FakeHttp};
use compat_ingest::app::ports::HttpGetResult;
use compat_ingest::app::ingest_use_case::{run_all, run_source};
use compat_ingest::constants::UNMAPPED_GAME_ID;
use compat_ingest::error::IngestError;
use compat_ingest::normalize::CompatStatus;
use compat_ingest::schema::{Confidence, OutputDocument};
use compat_ingest::sources::{dolphin, emudeck, vita3k, xemu, IngestContext, RunOptions, SourceRegistry};
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

const GAMECUBE_TABLE: &str = r#"<html><body>
<table>
  <tr><td>Super Mario 64</td><td>Playable</td></tr>
  <tr><td>Banjo-Kazooie</td><td>Crashes on boot</td></tr>
</table>
</body></html>"#;

const EMUDECK_PAGE: &str = r#"<html><script id="__NEXT_DATA__" type="application/json">
{"props": {"pageProps": {"games": [
    {"game": "Persona 5", "platform": "PlayStation 3", "status": "Great"},
    {"game": "Halo", "platform": "Original Xbox", "status": "Broken", "notes": "Black screen"},
    {"game": "Panzer Dragoon", "platform": "Sega Saturn", "status": "Playable"}
]}}}
</script></html>"#;

fn compat_doc(doc: OutputDocument) -> compat_ingest::schema::CompatSourceDocument {
    match doc {
        OutputDocument::Compat(d) => d,
        other => panic!("expected a compat document, got {}", other.schema_version()),
    }
}

#[test]
fn headerless_gamecube_table_yields_normalized_records() {
    let cache = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(dolphin::COMPAT_URL, html(GAMECUBE_TABLE));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let registry = SourceRegistry::new();
    let doc = compat_doc(registry.get("dolphin").unwrap().run(&ctx).unwrap());

    assert_eq!(doc.records.len(), 2);
    let mario = &doc.records[0];
    assert_eq!(mario.title.as_deref(), Some("Super Mario 64"));
    assert_eq!(mario.status.normalized, CompatStatus::Playable);
    assert_eq!(mario.status.raw.as_deref(), Some("Playable"));
    let banjo = &doc.records[1];
    assert_eq!(banjo.title.as_deref(), Some("Banjo-Kazooie"));
    assert_eq!(banjo.status.normalized, CompatStatus::Broken);

    for record in &doc.records {
        assert_eq!(record.platform_id, "gamecube");
        assert_eq!(record.emulator_id, "dolphin");
        assert_eq!(record.game_id, UNMAPPED_GAME_ID);
        assert_eq!(record.confidence, Confidence::High);
        assert_eq!(record.generated_at, doc.generated_at);
    }
}

#[test]
fn page_without_records_fails_and_writes_nothing() {
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(dolphin::COMPAT_URL, html("<html><body><p>Down for maintenance</p></body></html>"));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let registry = SourceRegistry::new();
    let target = out.path().join("compat.dolphin.json");
    let err = run_source(registry.get("dolphin").unwrap(), &ctx, &target).unwrap_err();

    assert!(matches!(err, IngestError::ZeroRecords { .. }));
    assert!(err.is_schema_drift());
    assert!(!target.exists());
}

#[test]
fn limit_caps_emitted_records() {
    let cache = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(dolphin::COMPAT_URL, html(GAMECUBE_TABLE));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let options = RunOptions {
        limit: Some(1),
        ..RunOptions::default()
    };
    let ctx = IngestContext::new(&fetcher, options);

    let doc = SourceRegistry::new().get("dolphin").unwrap().run(&ctx).unwrap();
    assert_eq!(doc.record_count(), 1);
}

#[test]
fn written_compat_document_matches_schema() {
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(dolphin::COMPAT_URL, html(GAMECUBE_TABLE));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let target = out.path().join("compat.dolphin.json");
    let run = run_source(SourceRegistry::new().get("dolphin").unwrap(), &ctx, &target).unwrap();
    assert_eq!(run.records, 2);

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["schemaVersion"], "compat-source-v1");
    assert_eq!(written["records"][1]["status"]["normalized"], "broken");
    let schema = compile_schema(include_str!("../schemas/compat-source.v1.json"));
    assert!(schema.is_valid(&written));
}

#[test]
fn layer_c_document_matches_schema() {
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(emudeck::SOURCE_URL, html(EMUDECK_PAGE));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let target = out.path().join("layerC.emudeck.json");
    let run = run_source(SourceRegistry::new().get("emudeck").unwrap(), &ctx, &target).unwrap();
    assert_eq!(run.records, 3);

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["source"]["hardwareScope"]["deviceFamily"], "Steam Deck");
    let schema = compile_schema(include_str!("../schemas/layerC.v1.json"));
    assert!(schema.is_valid(&written));
}

#[test]
fn run_all_records_failures_and_keeps_going() {
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    http.respond(dolphin::COMPAT_URL, html(GAMECUBE_TABLE));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    // "dolphin" also selects dolphin-gameini, whose listing is not served
    let only = vec!["dolphin".to_string()];
    let summary = run_all(&SourceRegistry::new(), &ctx, out.path(), &only);

    assert!(!summary.is_success());
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.succeeded[0].source_id, "dolphin");
    assert!(out.path().join("compat.dolphin.json").exists());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "dolphin-gameini");
    assert!(!out.path().join("settings.dolphin-gameini.json").exists());
    assert_eq!(http.calls_to("https://api.github.com/repos/dolphin-emu/dolphin/contents/Data/Sys/GameSettings"), 1);
}

#[test]
fn xdb_snapshot_yields_one_record_per_title_file() {
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    let snapshot = zip_of(&[
        ("xdb-main/README.md", "# xdb"),
        ("xdb-main/titles/4D530004.json", r#"{"title": "Halo: Combat Evolved", "compatibility": {"status": "Playable"}}"#),
        ("xdb-main/titles/4541000d.json", r#"{"title": "Burnout 3", "status": "Ingame"}"#),
    ]);
    http.respond(xemu::ARCHIVE_URL, HttpGetResult::ok(snapshot));
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let target = out.path().join("compat.xemu.json");
    let run = run_source(SourceRegistry::new().get("xemu").unwrap(), &ctx, &target).unwrap();
    assert_eq!(run.records, 2);

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["records"][0]["externalGameId"], "4d530004");
    assert_eq!(written["records"][0]["platformId"], "xbox");
    assert_eq!(written["records"][1]["status"]["normalized"], "ingame");
    let schema = compile_schema(include_str!("../schemas/compat-source.v1.json"));
    assert!(schema.is_valid(&written));
}

#[test]
fn vita3k_reads_the_database_out_of_a_zipped_release_asset() {
    let cache = tempfile::tempdir().unwrap();
    let http = FakeHttp::new();
    let release = r#"{"tag_name": "compat_db", "assets": [
        {"name": "compat_db.zip", "browser_download_url": "https://github.com/Vita3K/compatibility/releases/download/compat_db/compat_db.zip"}
    ]}"#;
    let database = r#"[
        {"title_id": "PCSE00001", "name": "Uncharted: Golden Abyss", "status": "Playable"},
        {"title_id": "PCSB00245", "name": "Persona 4 Golden", "status": "Menu"}
    ]"#;
    http.respond(vita3k::RELEASE_API, HttpGetResult::ok(release)).respond(
        "https://github.com/Vita3K/compatibility/releases/download/compat_db/compat_db.zip",
        HttpGetResult::ok(zip_of(&[("compat_db.json", database)])),
    );
    let fetcher = fetcher(&http, cache.path(), HOUR, 1);
    let ctx = IngestContext::new(&fetcher, RunOptions::default());

    let doc = compat_doc(SourceRegistry::new().get("vita3k").unwrap().run(&ctx).unwrap());
    assert_eq!(doc.records.len(), 2);
    assert_eq!(doc.records[0].external_game_id, "PCSE00001");
    assert_eq!(doc.records[0].platform_id, "psvita");
    assert_eq!(doc.records[1].status.normalized, CompatStatus::Intro);

    let value = serde_json::to_value(&doc).unwrap();
    let schema = compile_schema(include_str!("../schemas/compat-source.v1.json"));
    assert!(schema.is_valid(&value));
}
