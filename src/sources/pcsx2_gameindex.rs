//! PCSX2 `GameIndex.yaml`: per-serial hardware fixes, game fixes and patches.

use super::settings::{finish_settings, pick_str, settings_descriptor};
use super::{IngestContext, IngestSource};
use crate::builder::{ApplyModeRules, BuildReport, IdConvention, SettingsBuilder, SettingsDraft};
use crate::constants::SETTINGS_SCHEMA_VERSION;
use crate::error::Result;
use crate::extract::document::parse_yaml;
use crate::normalize::{CompatStatus, NumericScale, StatusNormalizer, Vocabulary};
use crate::schema::{Confidence, OutputDocument, SettingsDocument};
use serde_json::{Map, Value};
use tracing::{info, instrument};

pub const SOURCE_ID: &str = "pcsx2-gameindex";
pub const GAMEINDEX_URL: &str = "https://raw.githubusercontent.com/PCSX2/pcsx2/master/bin/resources/GameIndex.yaml";
pub const GAMEINDEX_PAGE_URL: &str = "https://github.com/PCSX2/pcsx2/blob/master/bin/resources/GameIndex.yaml";

const CATEGORIES: &[&str] = &["gsHWFixes", "gsSWFixes", "speedHacks", "gameFixes", "memcardFilters"];
const ROUND_MODE_KEYS: &[&str] = &["eeRoundMode", "vuRoundMode"];
const CLAMPING_KEYS: &[(&str, &str)] = &[("eeClamping", "eeClampMode"), ("vuClamping", "vuClampMode")];

/// `compat` field: 0 is unrated, 1 to 5 run from broken to perfect.
pub fn compat_scale() -> NumericScale {
    NumericScale::new()
        .sentinel(0)
        .band(1, 1, CompatStatus::Broken)
        .band(2, 2, CompatStatus::Intro)
        .band(3, 3, CompatStatus::Ingame)
        .band(4, 4, CompatStatus::Playable)
        .band(5, 5, CompatStatus::Perfect)
}

pub fn apply_rules() -> ApplyModeRules {
    ApplyModeRules::new()
        .required(&["gameFixes"])
        .patches_required()
        .auto(&["gsHWFixes", "gsSWFixes", "speedHacks"])
}

/// Known categories verbatim, round/clamp modes flattened to direct keys, nested groups kept.
pub fn extract_settings(entry: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    for category in CATEGORIES {
        if let Some(v) = entry.get(*category) {
            settings.insert(category.to_string(), v.clone());
        }
    }

    let round_modes = entry.get("roundModes").and_then(Value::as_object);
    for key in ROUND_MODE_KEYS {
        if let Some(v) = entry.get(*key).or_else(|| round_modes.and_then(|m| m.get(*key))) {
            settings.insert(key.to_string(), v.clone());
        }
    }

    let clamp_modes = entry.get("clampModes").and_then(Value::as_object);
    for (key, mode_key) in CLAMPING_KEYS {
        let value = entry.get(*key).or_else(|| {
            clamp_modes.and_then(|m| m.get(*mode_key).or_else(|| m.get(*key)))
        });
        if let Some(v) = value {
            settings.insert(key.to_string(), v.clone());
        }
    }

    for group in ["roundModes", "clampModes"] {
        if let Some(v) = entry.get(group).filter(|v| v.is_object()) {
            settings.entry(group).or_insert_with(|| v.clone());
        }
    }
    settings
}

/// Patches keyed by name (`default` or a CRC). Text comes from a bare string or `content`;
/// anything else is kept as YAML.
pub fn extract_patches(entry: &Map<String, Value>) -> Option<Map<String, Value>> {
    let patches = match entry.get("patches")? {
        Value::String(s) if !s.is_empty() => {
            let mut out = Map::new();
            out.insert("default".into(), Value::String(s.clone()));
            return Some(out);
        }
        Value::Object(o) => o,
        _ => return None,
    };
    let mut out = Map::new();
    for (name, data) in patches {
        let text = match data {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Object(o) => match o.get("content").and_then(Value::as_str) {
                Some(content) => content.to_string(),
                None => serde_yaml::to_string(data)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| data.to_string()),
            },
            other => other.to_string(),
        };
        out.insert(name.clone(), Value::String(text));
    }
    (!out.is_empty()).then_some(out)
}

pub struct Pcsx2GameIndex;

impl Pcsx2GameIndex {
    pub fn build_document(&self, yaml: &str, ctx: &IngestContext<'_>) -> Result<SettingsDocument> {
        let data = parse_yaml(yaml)?;
        let descriptor = settings_descriptor(
            SOURCE_ID,
            "PCSX2 GameIndex",
            GAMEINDEX_URL,
            "ps2",
            "pcsx2",
            "ps2-serial",
            IdConvention::Serial { dashed: true },
        )
        .with_confidence(Confidence::High);
        let rules = apply_rules();
        let normalizer = StatusNormalizer::with_vocabulary(Vocabulary::new().scale(compat_scale()));
        let builder = SettingsBuilder::new(&descriptor, &rules, SOURCE_ID).with_rating(&normalizer);

        let mut report = BuildReport::default();
        let mut entries_seen = 0;
        let mut items = Vec::new();
        let limit = ctx.options.limit.unwrap_or(usize::MAX);

        for (serial, entry) in data.as_object().into_iter().flatten() {
            entries_seen += 1;
            if items.len() >= limit {
                break;
            }
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let settings = extract_settings(entry);
            let patches = extract_patches(entry);
            // Title/region-only rows carry nothing to apply
            if settings.is_empty() && patches.is_none() {
                continue;
            }
            let draft = SettingsDraft {
                record_path: format!("$.{serial}"),
                external_game_id: serial.clone(),
                title: pick_str(entry, &["name", "name-en", "name_en"]),
                settings,
                patches,
                compat_raw: Some(pick_str(entry, &["compat"]).unwrap_or_else(|| "0".into())),
                region: pick_str(entry, &["region"]),
                ..SettingsDraft::default()
            };
            if let Some(item) = builder.build(draft, &mut report) {
                items.push(item);
            }
        }
        report.finish(SOURCE_ID);
        info!(entries = entries_seen, "GameIndex parsed");
        finish_settings(SOURCE_ID, GAMEINDEX_PAGE_URL, items, entries_seen, ctx)
    }
}

impl IngestSource for Pcsx2GameIndex {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn schema_version(&self) -> &'static str {
        SETTINGS_SCHEMA_VERSION
    }

    #[instrument(skip(self, ctx), fields(source = SOURCE_ID))]
    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        let yaml = ctx.fetch_text(GAMEINDEX_URL)?;
        self.build_document(&yaml, ctx).map(OutputDocument::Settings)
    }
}
