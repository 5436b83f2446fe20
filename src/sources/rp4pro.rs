//! Retroid Pocket 4 Pro community sheets (Google Sheets, one tab per platform).

use super::layer_c::{CandidateBatch, LayerCAdapter};
use super::IngestContext;
use crate::builder::{platform_token, PlatformTokens, SynonymResolver};
use crate::error::{IngestError, Result};
use crate::extract::{CanonicalField, Extractor, ExtractorConfig, FieldSynonyms};
use crate::schema::{HardwareScope, SourceInfo, SourceKind};
use crate::types::ContentKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{info, warn};

const SHEETS_BASE: &str = "https://docs.google.com/spreadsheets/d/";

pub const PLATFORMS: &[&str] = &["switch", "ps2", "3ds", "wii", "gamecube", "vita"];

pub const PLATFORM_ALIASES: &[(&str, &[&str])] = &[
    ("switch", &["switch", "nintendo switch", "ns", "yuzu", "ryujinx"]),
    ("ps2", &["ps2", "playstation2", "playstation 2", "pcsx2", "aethersx2", "nethersx2"]),
    ("3ds", &["3ds", "nintendo3ds", "nintendo 3ds", "citra", "lime3ds", "panda3ds"]),
    ("wii", &["wii", "nintendo wii", "dolphin wii"]),
    ("gamecube", &["gamecube", "gc", "dolphin gamecube"]),
    ("vita", &["vita", "ps vita", "vita3k"]),
];

// Tab metadata embedded in the sheet page, either field order
static TAB_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""gid"\s*:\s*(\d+)\s*,\s*"name"\s*:\s*"([^"]+)""#,
        r#""name"\s*:\s*"([^"]+)"\s*,\s*"gid"\s*:\s*(\d+)"#,
        r#""sheetId"\s*:\s*(\d+)\s*,\s*"title"\s*:\s*"([^"]+)""#,
        r#""title"\s*:\s*"([^"]+)"\s*,\s*"sheetId"\s*:\s*(\d+)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static BARE_GID: Lazy<Regex> = Lazy::new(|| Regex::new(r"gid=(\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTab {
    pub name: String,
    pub gid: String,
}

/// Tabs found in the sheet page, sorted by name (case-insensitive).
/// Without named metadata, every bare `gid=` becomes a `gid_<n>` tab.
pub fn discover_tabs(html: &str) -> Vec<SheetTab> {
    let mut tabs: BTreeMap<String, SheetTab> = BTreeMap::new();
    for pattern in TAB_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let (a, b) = (&caps[1], &caps[2]);
            let (gid, name) = if a.chars().all(|c| c.is_ascii_digit()) { (a, b) } else { (b, a) };
            let name = name.trim();
            if !name.is_empty() {
                tabs.insert(
                    name.to_lowercase(),
                    SheetTab {
                        name: name.to_string(),
                        gid: gid.to_string(),
                    },
                );
            }
        }
    }
    if tabs.is_empty() {
        for caps in BARE_GID.captures_iter(html) {
            let gid = &caps[1];
            tabs.insert(
                format!("gid_{gid}"),
                SheetTab {
                    name: format!("gid_{gid}"),
                    gid: gid.to_string(),
                },
            );
        }
    }
    tabs.into_values().collect()
}

fn aliases_for(platform_id: &str) -> Vec<String> {
    PLATFORM_ALIASES
        .iter()
        .find(|(id, _)| *id == platform_id)
        .map(|(_, aliases)| aliases.iter().map(|a| platform_token(a)).collect())
        .unwrap_or_else(|| vec![platform_token(platform_id)])
}

/// Alias containment either way first, then a shared prefix with the platform id.
pub fn auto_pick_tab<'a>(tabs: &'a [SheetTab], platform_id: &str) -> Option<&'a SheetTab> {
    let aliases = aliases_for(platform_id);
    let by_alias = tabs.iter().find(|t| {
        let tn = platform_token(&t.name);
        !tn.is_empty()
            && aliases
                .iter()
                .any(|a| *a == tn || a.contains(tn.as_str()) || tn.contains(a.as_str()))
    });
    if by_alias.is_some() {
        return by_alias;
    }
    let p = platform_token(platform_id);
    tabs.iter().find(|t| {
        let tn = platform_token(&t.name);
        !tn.is_empty() && (tn.starts_with(&p) || p.starts_with(&tn))
    })
}

pub fn sheet_synonyms() -> FieldSynonyms {
    FieldSynonyms::standard()
        .with(CanonicalField::Title, &["game", "title", "name", "game name", "game title"])
        .with(
            CanonicalField::Status,
            &["status", "compatibility", "rating", "playability", "playable", "performance"],
        )
        .with(CanonicalField::Emulator, &["emulator", "emu", "app", "core"])
        .with(
            CanonicalField::Version,
            &["version", "emu version", "emulator version", "build", "commit"],
        )
        .with(CanonicalField::Notes, &["notes", "comments", "settings", "fix", "tips"])
}

pub struct Rp4Pro {
    id: &'static str,
    sheet_id: &'static str,
    name: &'static str,
}

impl Rp4Pro {
    pub fn official() -> Self {
        Self {
            id: "rp4pro",
            sheet_id: "1pt2LCjE2RBvPlCQBmiPI7ashzGRzEAjx7O50wRfRq7U",
            name: "Retroid Pocket 4 Pro Compatibility Sheet",
        }
    }

    /// Raw community submissions.
    pub fn community() -> Self {
        Self {
            id: "rp4pro-community",
            sheet_id: "1BEtjET1HihLtNt1LCN0r44h7y3Lq1rvbeAd2gZ8re3s",
            name: "Retroid Pocket 4 Pro Community Tests",
        }
    }

    pub fn sheet_url(&self) -> String {
        format!("{SHEETS_BASE}{}/", self.sheet_id)
    }

    fn csv_by_gid(&self, gid: &str) -> String {
        format!("{}export?format=csv&gid={gid}", self.sheet_url())
    }

    fn csv_by_name(&self, name: &str) -> Result<String> {
        let base = format!("{}export", self.sheet_url());
        reqwest::Url::parse_with_params(&base, &[("format", "csv"), ("sheet", name)])
            .map(String::from)
            .map_err(|e| IngestError::Config(format!("bad sheet url {base}: {e}")))
    }

    fn extractor(&self) -> Extractor {
        Extractor::new(
            ExtractorConfig::new(self.id)
                .synonyms(sheet_synonyms())
                .header_rescan_rows(10),
        )
    }

    fn tab_batch(&self, ctx: &IngestContext<'_>, platform: &str, csv_url: &str, source_url: String) -> Result<CandidateBatch> {
        let csv = ctx.fetch_text(csv_url)?;
        let extraction = self.extractor().extract(&csv, ContentKind::Csv)?;
        info!(source = self.id, platform, rows = extraction.records.len(), "sheet tab parsed");
        Ok(CandidateBatch {
            source_url,
            default_platform: Some(platform.to_string()),
            candidates: extraction.records,
        })
    }
}

impl LayerCAdapter for Rp4Pro {
    fn id(&self) -> &'static str {
        self.id
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id.into(),
            name: self.name.into(),
            kind: SourceKind::Community,
            url: self.sheet_url(),
            hardware_scope: Some(HardwareScope {
                device_family: "Retroid Pocket 4 Pro".into(),
                chipset: Some("Dimensity 1100".into()),
            }),
        }
    }

    fn resolver(&self) -> SynonymResolver {
        SynonymResolver::new(sheet_synonyms(), "name")
    }

    fn platforms(&self) -> PlatformTokens {
        PLATFORM_ALIASES
            .iter()
            .fold(PlatformTokens::new(), |tokens, (id, aliases)| tokens.alias(id, aliases))
    }

    /// One batch per platform tab. A tab that fails to fetch or parse is logged and skipped.
    fn collect_batches(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateBatch>> {
        let page = ctx.fetch_text(&format!("{}edit?usp=sharing", self.sheet_url()))?;
        let tabs = discover_tabs(&page);
        info!(source = self.id, tabs = tabs.len(), "sheet tabs discovered");

        let mut batches = Vec::new();
        for platform in PLATFORMS {
            let attempt = match auto_pick_tab(&tabs, platform) {
                Some(tab) => {
                    info!(source = self.id, platform, tab = %tab.name, gid = %tab.gid, "tab picked");
                    let source_url = format!("{}edit#gid={}", self.sheet_url(), tab.gid);
                    self.tab_batch(ctx, platform, &self.csv_by_gid(&tab.gid), source_url)
                }
                None => self
                    .csv_by_name(platform)
                    .and_then(|url| self.tab_batch(ctx, platform, &url, self.sheet_url())),
            };
            match attempt {
                Ok(batch) => batches.push(batch),
                Err(e) => warn!(source = self.id, platform, error = %e, "sheet tab skipped"),
            }
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(name: &str, gid: &str) -> SheetTab {
        SheetTab {
            name: name.into(),
            gid: gid.into(),
        }
    }

    #[test]
    fn test_discover_tabs_both_orders() {
        let html = r#"{"gid":0,"name":"PS2"} ... {"title":"Switch (Yuzu)","sheetId":1234} {"name":"GameCube","gid":77}"#;
        let tabs = discover_tabs(html);
        assert_eq!(
            tabs,
            vec![tab("GameCube", "77"), tab("PS2", "0"), tab("Switch (Yuzu)", "1234")]
        );
    }

    #[test]
    fn test_discover_tabs_falls_back_to_bare_gids() {
        let html = r##"<a href="#gid=42">x</a><a href="#gid=7">y</a><a href="#gid=42">z</a>"##;
        let tabs = discover_tabs(html);
        assert_eq!(tabs, vec![tab("gid_42", "42"), tab("gid_7", "7")]);
    }

    #[test]
    fn test_auto_pick_uses_aliases_then_prefix() {
        let tabs = vec![tab("AetherSX2", "1"), tab("Switch (Yuzu)", "2"), tab("Vita Games", "3"), tab("GC", "4")];
        assert_eq!(auto_pick_tab(&tabs, "ps2").map(|t| t.gid.as_str()), Some("1"));
        assert_eq!(auto_pick_tab(&tabs, "switch").map(|t| t.gid.as_str()), Some("2"));
        assert_eq!(auto_pick_tab(&tabs, "vita").map(|t| t.gid.as_str()), Some("3"));
        assert_eq!(auto_pick_tab(&tabs, "gamecube").map(|t| t.gid.as_str()), Some("4"));
        assert!(auto_pick_tab(&tabs, "3ds").is_none());
    }

    #[test]
    fn test_sheet_rows_after_banner_are_extracted() {
        let csv = "Retroid Pocket 4 Pro - PS2,,,\nGame,Status,Emu Version,Tips\nOkami,Great,v1.7,2x res\nGod of War II,Poor,v1.7,\n";
        let extraction = Rp4Pro::official().extractor().extract(csv, ContentKind::Csv).unwrap();
        assert_eq!(extraction.records.len(), 2);
        let resolver = Rp4Pro::official().resolver();
        assert_eq!(resolver.text(&extraction.records[0], CanonicalField::Version).as_deref(), Some("v1.7"));
        assert_eq!(resolver.text(&extraction.records[0], CanonicalField::Notes).as_deref(), Some("2x res"));
    }
}
