//! DuckStation `gamedb.yaml`: curated per-serial traits, fixes and recommended settings.

use super::settings::{finish_settings, pick, pick_str, settings_descriptor};
use super::{IngestContext, IngestSource};
use crate::builder::{ApplyModeRules, BuildReport, IdConvention, SettingsBuilder, SettingsDraft};
use crate::constants::SETTINGS_SCHEMA_VERSION;
use crate::error::Result;
use crate::extract::document::parse_yaml;
use crate::schema::{Confidence, OutputDocument, SettingsDocument};
use serde_json::{Map, Value};
use tracing::instrument;

pub const SOURCE_ID: &str = "duckstation-gamedb";
pub const PRIMARY_URL: &str = "https://raw.githubusercontent.com/stenzek/duckstation/master/data/resources/gamedb.yaml";
pub const MIRROR_URL: &str = "https://raw.githubusercontent.com/RetroDECK/Duckstation/main/data/resources/gamedb.yaml";

const SETTINGS_KEYS: &[&str] = &["settings", "enhancements", "hacks", "fixes", "traits", "notes"];

pub fn apply_rules() -> ApplyModeRules {
    ApplyModeRules::new()
        .required(&["traits", "fixes"])
        .suggested_only(&["enhancements"])
        .meta(&["notes"])
        .auto(&["hacks", "settings"])
}

/// Game objects from a list, a `games`/`entries`/`data` list, or a map keyed by serial.
pub fn iter_games(data: &Value) -> Vec<Map<String, Value>> {
    match data {
        Value::Array(list) => list.iter().filter_map(|g| g.as_object().cloned()).collect(),
        Value::Object(obj) => {
            if let Some(list) = ["games", "entries", "data"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))
            {
                return list.iter().filter_map(|g| g.as_object().cloned()).collect();
            }
            obj.iter()
                .filter_map(|(key, v)| {
                    let mut game = v.as_object()?.clone();
                    game.entry("serial").or_insert_with(|| Value::String(key.clone()));
                    Some(game)
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

pub fn normalize_serial(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .replace('_', "-")
        .chars()
        .filter(|c| *c != ' ')
        .collect()
}

/// Every serial a game lists, normalized, sorted and deduplicated.
pub fn serials_of(game: &Map<String, Value>) -> Vec<String> {
    let mut serials: Vec<String> = Vec::new();
    if let Some(s) = pick(game, &["serial", "serial_id", "serialId"]).and_then(Value::as_str) {
        serials.push(s.to_string());
    }
    if let Some(list) = pick(game, &["serials", "ids", "identifiers"]).and_then(Value::as_array) {
        serials.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
    }
    let mut serials: Vec<String> = serials
        .iter()
        .map(|s| normalize_serial(s))
        .filter(|s| !s.is_empty())
        .collect();
    serials.sort();
    serials.dedup();
    serials
}

fn extract_settings(game: &Map<String, Value>) -> Map<String, Value> {
    SETTINGS_KEYS
        .iter()
        .filter_map(|k| {
            let v = game.get(*k)?;
            let empty = match v {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            };
            (!empty).then(|| (k.to_string(), v.clone()))
        })
        .collect()
}

pub struct DuckStationGameDb;

impl DuckStationGameDb {
    pub fn build_document(&self, yaml: &str, source_url: &str, ctx: &IngestContext<'_>) -> Result<SettingsDocument> {
        let data = parse_yaml(yaml)?;
        let descriptor = settings_descriptor(
            SOURCE_ID,
            "DuckStation GameDB",
            source_url,
            "psx",
            "duckstation",
            "psx-serial",
            IdConvention::Serial { dashed: true },
        )
        .with_confidence(Confidence::High);
        let rules = apply_rules();
        let builder = SettingsBuilder::new(&descriptor, &rules, SOURCE_ID);

        let mut report = BuildReport::default();
        let mut entries_seen = 0;
        let mut items = Vec::new();
        for (i, game) in iter_games(&data).iter().enumerate() {
            entries_seen += 1;
            let serials = serials_of(game);
            if serials.is_empty() {
                report.dropped += 1;
                continue;
            }
            let title = pick_str(game, &["title", "name"]);
            let settings = extract_settings(game);
            // One item per serial; multi-disc games share their settings
            for serial in serials {
                let draft = SettingsDraft {
                    record_path: format!("games[{i}]"),
                    external_game_id: serial,
                    title: title.clone(),
                    settings: settings.clone(),
                    ..SettingsDraft::default()
                };
                if let Some(item) = builder.build(draft, &mut report) {
                    items.push(item);
                }
            }
        }
        report.finish(SOURCE_ID);
        finish_settings(SOURCE_ID, source_url, items, entries_seen, ctx)
    }
}

impl IngestSource for DuckStationGameDb {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn schema_version(&self) -> &'static str {
        SETTINGS_SCHEMA_VERSION
    }

    #[instrument(skip(self, ctx), fields(source = SOURCE_ID))]
    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        let (url, yaml) = ctx.fetch_first(&[PRIMARY_URL, MIRROR_URL])?;
        self.build_document(&yaml, &url, ctx).map(OutputDocument::Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ApplyMode;
    use serde_json::json;

    #[test]
    fn test_keyed_map_uses_key_as_serial() {
        let data = json!({"SLUS-00594": {"name": "Crash Bandicoot", "traits": ["ForceInterpreter"]}});
        let games = iter_games(&data);
        assert_eq!(games.len(), 1);
        assert_eq!(serials_of(&games[0]), vec!["SLUS-00594"]);
    }

    #[test]
    fn test_games_list_and_serial_lists() {
        let data = json!({"games": [
            {"serial": "slus_012.34", "serials": ["SLUS-01234", "SLUS-01235", " slus-01235 "], "title": "FF"},
            {"title": "No serial"}
        ]});
        let games = iter_games(&data);
        assert_eq!(games.len(), 2);
        assert_eq!(serials_of(&games[0]), vec!["SLUS-012.34", "SLUS-01234", "SLUS-01235"]);
        assert!(serials_of(&games[1]).is_empty());
    }

    #[test]
    fn test_apply_modes() {
        let rules = apply_rules();
        let traits = extract_settings(json!({"traits": ["DisableUpscaling"], "notes": "x"}).as_object().unwrap());
        assert_eq!(rules.classify(&traits, None), ApplyMode::Required);
        let enh = extract_settings(json!({"enhancements": {"widescreen": true}, "notes": "x"}).as_object().unwrap());
        assert_eq!(rules.classify(&enh, None), ApplyMode::Suggested);
        let empty = extract_settings(json!({"traits": [], "hacks": {"a": 1}}).as_object().unwrap());
        assert!(!empty.contains_key("traits"));
        assert_eq!(rules.classify(&empty, None), ApplyMode::Auto);
    }
}
