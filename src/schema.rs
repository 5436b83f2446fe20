//! Output document shapes. Field names are camelCase on the wire.

use crate::constants::{COMPAT_SCHEMA_VERSION, LAYER_C_SCHEMA_VERSION, SETTINGS_SCHEMA_VERSION, UNMAPPED_GAME_ID};
use crate::error::Result;
use crate::normalize::{CompatStatus, PerformanceTier};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Official,
    Community,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low", alias = "layerC")]
    Low,
}

impl Confidence {
    /// Official lists are trusted most, community reports less, device reports least.
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Official => Confidence::High,
            SourceKind::Community => Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    Required,
    Auto,
    Suggested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareScope {
    pub device_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chipset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_scope: Option<HardwareScope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub normalized: CompatStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Links {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Timestamps are written as RFC 3339 with a `Z` suffix and second precision.
pub fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityRecord {
    pub platform_id: String,
    pub emulator_id: String,
    pub external_id_type: String,
    pub external_game_id: String,
    #[serde(default = "unmapped")]
    pub game_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: StatusValue,
    pub confidence: Confidence,
    pub source: SourceInfo,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

fn unmapped() -> String {
    UNMAPPED_GAME_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatSourceDocument {
    pub schema_version: String,
    pub source: SourceInfo,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub records: Vec<CompatibilityRecord>,
}

impl CompatSourceDocument {
    pub fn new(source: SourceInfo, generated_at: DateTime<Utc>, records: Vec<CompatibilityRecord>) -> Self {
        Self {
            schema_version: COMPAT_SCHEMA_VERSION.to_string(),
            source,
            generated_at,
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub platform_id: String,
    pub emulator_id: String,
    pub external_id_type: String,
    pub external_game_id: String,
    #[serde(default = "unmapped")]
    pub game_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Map<String, Value>>,
    pub settings_format: String,
    pub apply_mode: ApplyMode,
    pub confidence: Confidence,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compat_rating: Option<StatusValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_issues: Option<Vec<String>>,
    /// Per-setting remarks keyed like `settings` (section, then key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_notes: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub schema_version: String,
    pub source: String,
    pub source_url: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub items: Vec<SettingsRecord>,
}

impl SettingsDocument {
    pub fn new(source: &str, source_url: &str, generated_at: DateTime<Utc>, items: Vec<SettingsRecord>) -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION.to_string(),
            source: source.to_string(),
            source_url: source_url.to_string(),
            generated_at,
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceValue {
    pub raw: String,
    pub normalized: CompatStatus,
    pub tier: PerformanceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerCItem {
    pub platform_id: String,
    pub game_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_game_id: Option<String>,
    pub performance: PerformanceValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_version: Option<String>,
    pub settings: Map<String, Value>,
    pub confidence: Confidence,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerCDocument {
    pub schema_version: String,
    pub source: SourceInfo,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub items: Vec<LayerCItem>,
}

impl LayerCDocument {
    pub fn new(source: SourceInfo, generated_at: DateTime<Utc>, items: Vec<LayerCItem>) -> Self {
        Self {
            schema_version: LAYER_C_SCHEMA_VERSION.to_string(),
            source,
            generated_at,
            items,
        }
    }
}

/// Whatever a source run produces.
#[derive(Debug, Clone)]
pub enum OutputDocument {
    Compat(CompatSourceDocument),
    Settings(SettingsDocument),
    LayerC(LayerCDocument),
}

impl OutputDocument {
    pub fn schema_version(&self) -> &str {
        match self {
            OutputDocument::Compat(d) => &d.schema_version,
            OutputDocument::Settings(d) => &d.schema_version,
            OutputDocument::LayerC(d) => &d.schema_version,
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            OutputDocument::Compat(d) => d.records.len(),
            OutputDocument::Settings(d) => d.items.len(),
            OutputDocument::LayerC(d) => d.items.len(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        match self {
            OutputDocument::Compat(d) => write_json(path, d),
            OutputDocument::Settings(d) => write_json(path, d),
            OutputDocument::LayerC(d) => write_json(path, d),
        }
    }
}

/// Pretty-printed JSON with a trailing newline; parent directories are created.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
