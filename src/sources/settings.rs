//! Shared pieces for per-game settings databases (`emulator-settings-v1`).

use super::IngestContext;
use crate::builder::{IdConvention, SettingsStats, SourceDescriptor};
use crate::error::{IngestError, Result};
use crate::schema::{SettingsDocument, SettingsRecord, SourceInfo, SourceKind};
use serde_json::{Map, Value};
use tracing::info;

/// Descriptor for an upstream-maintained settings database.
pub fn settings_descriptor(
    id: &str,
    name: &str,
    url: &str,
    platform_id: &str,
    emulator_id: &str,
    id_type: &str,
    convention: IdConvention,
) -> SourceDescriptor {
    let info = SourceInfo {
        id: id.to_string(),
        name: name.to_string(),
        kind: SourceKind::Official,
        url: url.to_string(),
        hardware_scope: None,
    };
    SourceDescriptor::new(info, platform_id, emulator_id, id_type, convention)
}

/// First present, non-empty value among `keys`.
pub fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

pub fn pick_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    pick(obj, keys).and_then(|v| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Applies the limit, logs the run summary and refuses to emit an empty document.
pub fn finish_settings(
    source_id: &str,
    source_url: &str,
    items: Vec<SettingsRecord>,
    entries_seen: usize,
    ctx: &IngestContext<'_>,
) -> Result<SettingsDocument> {
    let items = ctx.options.apply_limit(items);
    if items.is_empty() {
        return Err(IngestError::ZeroRecords {
            context: source_id.to_string(),
            tried: format!("settings builder over {entries_seen} entries"),
        });
    }
    let mut stats = SettingsStats {
        entries_seen,
        ..SettingsStats::default()
    };
    for item in &items {
        stats.record(item);
    }
    stats.log(source_id);
    info!(source = source_id, items = items.len(), "settings source complete");
    Ok(SettingsDocument::new(source_id, source_url, ctx.generated_at, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_skips_empty_values() {
        let obj = json!({"serial": "", "serial_id": "SLUS_005.94", "title": null, "name": "Crash"});
        let obj = obj.as_object().unwrap();
        assert_eq!(pick_str(obj, &["serial", "serial_id"]).as_deref(), Some("SLUS_005.94"));
        assert_eq!(pick_str(obj, &["title", "name"]).as_deref(), Some("Crash"));
        assert!(pick(obj, &["missing"]).is_none());
    }
}
