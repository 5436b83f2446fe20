//! Dolphin per-game INI files (`Data/Sys/GameSettings/<GAMEID>.ini`).
//!
//! Files come from a local Dolphin checkout when `--local-dir` is given, otherwise from the
//! GitHub contents listing plus one raw download per file. The contents API stops at 1000
//! entries, so an empty, failed or capped listing falls back to the recursive git tree.

use super::dolphin::platform_for_game_id;
use super::settings::{finish_settings, settings_descriptor};
use super::{IngestContext, IngestSource};
use crate::builder::{ApplyModeRules, BuildReport, IdConvention, SettingsBuilder, SettingsDraft};
use crate::constants::SETTINGS_SCHEMA_VERSION;
use crate::error::{IngestError, Result};
use crate::extract::ini::parse_game_ini;
use crate::schema::{Confidence, OutputDocument, SettingsDocument};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const SOURCE_ID: &str = "dolphin-gameini";
pub const SOURCE_URL: &str = "https://github.com/dolphin-emu/dolphin/tree/master/Data/Sys/GameSettings";
pub const CONTENTS_API: &str = "https://api.github.com/repos/dolphin-emu/dolphin/contents/Data/Sys/GameSettings";
pub const TREE_API: &str = "https://api.github.com/repos/dolphin-emu/dolphin/git/trees/master?recursive=1";
pub const RAW_BASE: &str = "https://raw.githubusercontent.com/dolphin-emu/dolphin/master/Data/Sys/GameSettings";
const SETTINGS_FORMAT: &str = "dolphin-ini";
const TREE_PREFIX: &str = "Data/Sys/GameSettings/";
/// Directory listings from the contents API are cut off at this many entries
pub const CONTENTS_LISTING_CAP: usize = 1000;

pub fn apply_rules() -> ApplyModeRules {
    ApplyModeRules::new()
        .core(
            "Core",
            &["CPUThread", "SyncOnSkipIdle", "GPUDeterminismMode", "FastDiscSpeed", "MMU", "DSPHLE", "DSPThread"],
        )
        .required(&["Patch", "Gecko", "ActionReplay", "Wii", "Wii_SIDevice"])
        .suggested_only(&["Video_Enhancements"])
        .meta(&["EmuState"])
        .auto(&["Video_Hacks", "Video_Settings", "Video_Enhancements", "Video_Stereoscopy", "Video"])
}

/// One INI to read: its file name and where to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IniFile {
    Local(PathBuf),
    Remote { name: String, url: String },
}

impl IniFile {
    pub fn name(&self) -> String {
        match self {
            IniFile::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            IniFile::Remote { name, .. } => name.clone(),
        }
    }

    /// Game id is the file stem (`GZLE01.ini` -> `GZLE01`).
    pub fn game_id(&self) -> String {
        let name = self.name();
        match name.len().checked_sub(4) {
            Some(stem_len) if name.to_ascii_lowercase().ends_with(".ini") => name[..stem_len].to_string(),
            _ => name,
        }
    }
}

pub fn list_local(local_dir: &Path) -> Result<Vec<IniFile>> {
    let root = local_dir.join("Data").join("Sys").join("GameSettings");
    if !root.is_dir() {
        return Err(IngestError::Config(format!(
            "local GameSettings directory not found: {}",
            root.display()
        )));
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(&root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ini"))
        })
        .collect();
    paths.sort();
    Ok(paths.into_iter().map(IniFile::Local).collect())
}

/// `.ini` entries of a contents API listing, sorted by name.
pub fn files_from_listing(listing: &Value) -> Vec<IniFile> {
    let mut files: Vec<IniFile> = listing
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            if !name.to_ascii_lowercase().ends_with(".ini") {
                return None;
            }
            let url = item
                .get("download_url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{RAW_BASE}/{name}"));
            Some(IniFile::Remote {
                name: name.to_string(),
                url,
            })
        })
        .collect();
    files.sort_by_key(IniFile::name);
    files.dedup();
    files
}

/// `.ini` blobs directly under `Data/Sys/GameSettings/` in a recursive tree listing, plus
/// whether GitHub truncated the tree.
pub fn files_from_tree(tree: &Value) -> (Vec<IniFile>, bool) {
    let truncated = tree.get("truncated").and_then(Value::as_bool).unwrap_or(false);
    let mut files: Vec<IniFile> = tree
        .get("tree")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|node| {
            let name = node.get("path")?.as_str()?.strip_prefix(TREE_PREFIX)?;
            if name.contains('/') || !name.to_ascii_lowercase().ends_with(".ini") {
                return None;
            }
            Some(IniFile::Remote {
                name: name.to_string(),
                url: format!("{RAW_BASE}/{name}"),
            })
        })
        .collect();
    files.sort_by_key(IniFile::name);
    files.dedup();
    (files, truncated)
}

pub struct DolphinGameIni;

impl DolphinGameIni {
    fn list_files(&self, ctx: &IngestContext<'_>) -> Result<Vec<IniFile>> {
        match &ctx.options.local_dir {
            Some(dir) => list_local(dir),
            None => self.list_remote(ctx),
        }
    }

    fn list_remote(&self, ctx: &IngestContext<'_>) -> Result<Vec<IniFile>> {
        let listing = ctx
            .fetch_text(CONTENTS_API)
            .and_then(|text| Ok(serde_json::from_str::<Value>(&text)?));
        let (files, capped) = match listing {
            Ok(listing) => {
                let entries = listing.as_array().map_or(0, Vec::len);
                (files_from_listing(&listing), entries >= CONTENTS_LISTING_CAP)
            }
            Err(e) => {
                warn!(error = %e, "contents listing failed, trying the git tree");
                (Vec::new(), false)
            }
        };
        if !files.is_empty() && !capped {
            return Ok(files);
        }
        if capped {
            warn!(files = files.len(), "contents listing hit the API cap, trying the git tree");
        }

        let tree: Value = serde_json::from_str(&ctx.fetch_text(TREE_API)?)?;
        let (tree_files, truncated) = files_from_tree(&tree);
        if truncated {
            warn!(
                files = tree_files.len(),
                "git tree listing truncated by GitHub; use --local-dir for a complete run"
            );
        }
        Ok(if tree_files.len() >= files.len() { tree_files } else { files })
    }

    fn read_file(&self, file: &IniFile, ctx: &IngestContext<'_>) -> Result<String> {
        match file {
            IniFile::Local(path) => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
            IniFile::Remote { url, .. } => ctx.fetch_text(url),
        }
    }

    pub fn build_document(&self, files: &[IniFile], ctx: &IngestContext<'_>) -> Result<SettingsDocument> {
        let descriptor = settings_descriptor(
            SOURCE_ID,
            "Dolphin GameSettings",
            SOURCE_URL,
            "gamecube",
            "dolphin",
            "dolphin-game-id",
            IdConvention::Verbatim,
        )
        .with_confidence(Confidence::High);
        let rules = apply_rules();
        let builder = SettingsBuilder::new(&descriptor, &rules, SETTINGS_FORMAT);

        let mut report = BuildReport::default();
        let mut entries_seen = 0;
        let mut items = Vec::new();
        for (i, file) in files.iter().enumerate() {
            if i > 0 && i % 200 == 0 {
                info!(processed = i, total = files.len(), "GameSettings progress");
            }
            entries_seen += 1;
            let content = match self.read_file(file, ctx) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %file.name(), error = %e, "skipping unreadable INI");
                    report.dropped += 1;
                    continue;
                }
            };
            let ini = parse_game_ini(&content);
            let game_id = file.game_id();
            let draft = SettingsDraft {
                record_path: file.name(),
                platform_id: Some(platform_for_game_id(&game_id).to_string()),
                external_game_id: game_id,
                title: ini.title,
                settings: ini.sections,
                source_url: Some(format!("{RAW_BASE}/{}", file.name())),
                ..SettingsDraft::default()
            };
            if let Some(item) = builder.build(draft, &mut report) {
                items.push(item);
            }
        }
        report.finish(SOURCE_ID);
        finish_settings(SOURCE_ID, SOURCE_URL, items, entries_seen, ctx)
    }
}

impl IngestSource for DolphinGameIni {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn schema_version(&self) -> &'static str {
        SETTINGS_SCHEMA_VERSION
    }

    #[instrument(skip(self, ctx), fields(source = SOURCE_ID))]
    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        // Limit before fetching; every file is a request
        let files = ctx.options.apply_limit(self.list_files(ctx)?);
        info!(files = files.len(), "GameSettings files listed");
        self.build_document(&files, ctx).map(OutputDocument::Settings)
    }
}
