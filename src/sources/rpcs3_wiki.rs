//! RPCS3 wiki per-game configuration (`emulator-settings-v1`).
//!
//! The game list comes from the compatibility export. Each title is resolved to a wiki page
//! through the MediaWiki API (exact title, then search) and the rendered page is read for
//! its `Configuration` tables, `Known Issues` and `Special Notes`.

use super::rpcs3::{Rpcs3, EXPORT_URL};
use super::settings::{finish_settings, settings_descriptor};
use super::{CompatAdapter, IngestContext, IngestSource};
use crate::builder::{ApplyModeRules, BuildReport, IdConvention, SettingsBuilder, SettingsDraft};
use crate::constants::SETTINGS_SCHEMA_VERSION;
use crate::error::{IngestError, Result};
use crate::schema::{Confidence, OutputDocument, SettingsDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const SOURCE_ID: &str = "rpcs3-wiki";
pub const WIKI_BASE: &str = "https://wiki.rpcs3.net";
pub const WIKI_API: &str = "https://wiki.rpcs3.net/api.php";
const SETTINGS_FORMAT: &str = "rpcs3-config";

/// Compatibility export states, worst first.
pub const STATUS_ORDER: &[&str] = &["Nothing", "Loadable", "Intro", "Ingame", "Playable"];
pub const DEFAULT_MIN_STATUS: &str = "Ingame";

static GAME_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{4}\d{5}\b").expect("valid regex"));
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*?\)\s*").expect("valid regex"));
static NON_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 :/+-]").expect("valid regex"));
static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*%$").expect("valid regex"));
static MILLIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*ms$").expect("valid regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));

static PARSER_OUTPUT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.mw-parser-output").expect("valid selector"));
static INFOBOX: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"table[class*="infobox"]"#).expect("valid selector"));
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static TH: Lazy<Selector> = Lazy::new(|| Selector::parse("th").expect("valid selector"));
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static LI: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("valid selector"));
static INNER_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4").expect("valid selector"));

/// Configuration subsections, matched as whole words against the heading text.
const SECTION_ALIASES: &[(&str, &[&str])] = &[
    ("cpu", &["cpu configuration", "cpu"]),
    ("gpu", &["gpu configuration", "gpu"]),
    ("audio", &["audio configuration", "audio"]),
    ("io", &["i/o configuration", "io configuration", "i/o", "io"]),
    ("network", &["network configuration", "network"]),
    ("advanced", &["advanced configuration", "advanced"]),
    ("debug", &["debug configuration", "debug"]),
    ("patches", &["recommended patches", "patches"]),
];

/// Display names whose camel-cased form would read badly.
const SETTING_KEYS: &[(&str, &str)] = &[
    ("spu block size", "spuBlockSize"),
    ("preferred spu threads", "preferredSpuThreads"),
    ("enable spu loop detection", "spuLoopDetection"),
    ("spu decoder", "spuDecoder"),
    ("ppu decoder", "ppuDecoder"),
    ("thread scheduler", "threadScheduler"),
    ("spu xfloat accuracy", "spuXfloatAccuracy"),
    ("renderer", "renderer"),
    ("resolution scale", "resolutionScale"),
    ("write color buffers", "writeColorBuffers"),
    ("read color buffers", "readColorBuffers"),
    ("read depth buffers", "readDepthBuffers"),
    ("write depth buffers", "writeDepthBuffers"),
    ("anti-aliasing", "antiAliasing"),
    ("anisotropic filter", "anisotropicFilter"),
    ("zcull accuracy", "zcullAccuracy"),
    ("multithreaded rsx", "multithreadedRsx"),
    ("strict rendering mode", "strictRenderingMode"),
    ("vsync", "vsync"),
    ("stretch to display area", "stretchToDisplayArea"),
    ("audio out windows", "audioOutWindows"),
    ("audio out linux", "audioOutLinux"),
    ("audio buffer duration", "audioBufferDuration"),
    ("enable buffering", "audioEnableBuffering"),
    ("network status", "networkStatus"),
    ("psn status", "psnStatus"),
];

pub fn apply_rules() -> ApplyModeRules {
    ApplyModeRules::new()
        .required(&["patches"])
        .suggested_only(&["cpu", "gpu", "audio", "io", "network", "advanced", "debug"])
}

/// A title from the compatibility export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRef {
    pub serial: String,
    pub title: String,
    pub status: Option<String>,
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Games from the export's `results`, keyed by serial or listed; entries without a title are dropped.
pub fn games_from_export(export: &Value) -> Vec<GameRef> {
    let results = export.get("results").unwrap_or(export);
    match results {
        Value::Object(map) => map
            .iter()
            .filter_map(|(serial, info)| {
                let info = info.as_object()?;
                Some(GameRef {
                    serial: serial.clone(),
                    title: str_field(info, &["title", "name"])?,
                    status: str_field(info, &["status", "compatibility"]),
                })
            })
            .collect(),
        Value::Array(rows) => rows
            .iter()
            .filter_map(|row| {
                let row = row.as_object()?;
                Some(GameRef {
                    serial: str_field(row, &["serial", "id"])?,
                    title: str_field(row, &["title", "name"])?,
                    status: str_field(row, &["status"]),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Keeps unrated games and those at or above `min_status`; an unrecognized minimum keeps everything.
pub fn meets_min_status(game: &GameRef, min_status: &str) -> bool {
    let Some(min) = STATUS_ORDER.iter().position(|s| *s == min_status) else {
        return true;
    };
    match &game.status {
        None => true,
        Some(status) => STATUS_ORDER
            .iter()
            .position(|s| s == status)
            .is_some_and(|i| i >= min),
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse(&el.text().collect::<Vec<_>>().join(" "))
}

fn canonicalize_key(raw: &str) -> String {
    let lowered: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' => '-',
            '_' => ' ',
            other => other,
        })
        .collect();
    let without_notes = PARENTHETICAL.replace_all(&lowered, " ");
    collapse(&NON_KEY_CHARS.replace_all(&without_notes, ""))
}

fn to_camel(s: &str) -> String {
    let mut parts = s.split(|c: char| !c.is_ascii_alphanumeric()).filter(|p| !p.is_empty());
    let Some(first) = parts.next() else {
        return "unknown".to_string();
    };
    let mut out = first.to_lowercase();
    for part in parts {
        let mut chars = part.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Wiki display name to a settings key (`Preferred SPU Threads` -> `preferredSpuThreads`).
pub fn normalize_setting_key(display: &str) -> String {
    let canonical = canonicalize_key(display);
    SETTING_KEYS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, key)| key.to_string())
        .unwrap_or_else(|| to_camel(&canonical))
}

/// Option cell to a JSON value: on/off words, `150%`, `100ms`, integers and decimals are typed.
/// `Disabled` stays a string since it often names a mode rather than a switch.
pub fn parse_option_value(raw: &str) -> Option<Value> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let low = s.to_lowercase();
    let typed = match low.as_str() {
        "on" | "enabled" | "true" | "yes" => Some(Value::Bool(true)),
        "off" | "false" | "no" => Some(Value::Bool(false)),
        "disabled" => Some(Value::String("Disabled".into())),
        _ => None,
    };
    if typed.is_some() {
        return typed;
    }
    let integer = PERCENT
        .captures(s)
        .or_else(|| MILLIS.captures(&low))
        .map(|c| c[1].to_string())
        .or_else(|| s.chars().all(|c| c.is_ascii_digit()).then(|| s.to_string()));
    if let Some(n) = integer.and_then(|d| d.parse::<i64>().ok()) {
        return Some(Value::from(n));
    }
    if DECIMAL.is_match(s) {
        if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Some(Value::Number(n));
        }
    }
    Some(Value::String(s.to_string()))
}

fn section_for_heading(text: &str) -> Option<&'static str> {
    let padded = format!(" {} ", canonicalize_key(text));
    SECTION_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| padded.contains(&format!(" {a} "))))
        .map(|(key, _)| *key)
}

/// Level and text of a heading, including the newer `<div class="mw-heading">` wrapper.
fn heading(el: ElementRef<'_>) -> Option<(u8, String)> {
    let level = |name: &str| match name {
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        _ => None,
    };
    if let Some(l) = level(el.value().name()) {
        return Some((l, text_of(el)));
    }
    let wrapped = el.value().name() == "div"
        && el.value().classes().any(|c| c == "mw-heading");
    if !wrapped {
        return None;
    }
    let inner = el.select(&INNER_HEADING).next()?;
    Some((level(inner.value().name())?, text_of(inner)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Configuration,
    KnownIssues,
    Notes,
    Other,
}

fn block_for_heading(text: &str) -> Block {
    let t = canonicalize_key(text);
    if t.contains("configuration") {
        Block::Configuration
    } else if t.contains("known issues") {
        Block::KnownIssues
    } else if t.contains("special notes") || t == "notes" {
        Block::Notes
    } else {
        Block::Other
    }
}

/// What a rendered game page contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WikiPage {
    pub game_ids: Vec<String>,
    pub settings: Map<String, Value>,
    pub setting_notes: Map<String, Value>,
    pub known_issues: Vec<String>,
    pub notes: Vec<String>,
}

impl WikiPage {
    pub fn is_meaningful(&self) -> bool {
        !self.settings.is_empty() || !self.known_issues.is_empty() || !self.notes.is_empty()
    }
}

fn section_entry<'m>(map: &'m mut Map<String, Value>, section: &str) -> Option<&'m mut Map<String, Value>> {
    map.entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

fn push_unique(list: &mut Vec<String>, prefix: &str, text: &str) {
    let text = collapse(text);
    if text.is_empty() {
        return;
    }
    let line = if prefix.is_empty() { text } else { format!("{prefix}: {text}") };
    if !list.contains(&line) {
        list.push(line);
    }
}

/// Game ids from the infobox `GameID(s)` row, else anywhere in the page.
fn game_ids(doc: &Html) -> Vec<String> {
    let from_infobox = doc.select(&INFOBOX).next().and_then(|infobox| {
        infobox.select(&TR).find_map(|row| {
            let label = text_of(row.select(&TH).next()?).to_lowercase();
            let cell = row.select(&TD).next()?;
            (label.contains("gameid") || label.contains("game id")).then(|| text_of(cell))
        })
    });
    let mut ids: BTreeSet<String> = from_infobox
        .map(|text| GAME_ID.find_iter(&text).map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default();
    if ids.is_empty() {
        let all = text_of(doc.root_element());
        ids = GAME_ID.find_iter(&all).map(|m| m.as_str().to_string()).collect();
    }
    ids.into_iter().collect()
}

fn read_config_table(table: ElementRef<'_>, section: &str, page: &mut WikiPage) {
    for row in table.select(&TR) {
        let cells: Vec<String> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "td" | "th"))
            .map(text_of)
            .collect();
        if cells.len() < 2 {
            continue;
        }
        let header = cells.iter().take(3).map(|c| c.to_lowercase()).collect::<Vec<_>>().join(" ");
        if header.contains("setting") && header.contains("option") {
            continue;
        }
        let key = normalize_setting_key(&cells[0]);
        if let Some(value) = parse_option_value(&cells[1]) {
            if let Some(entries) = section_entry(&mut page.settings, section) {
                entries.insert(key.clone(), value);
            }
        }
        if let Some(note) = cells.get(2).filter(|n| !n.is_empty()) {
            if let Some(entries) = section_entry(&mut page.setting_notes, section) {
                entries.insert(key, Value::String(note.clone()));
            }
        }
    }
}

/// Reads a rendered page. Only top-level blocks are walked, in document order.
pub fn parse_page(html: &str) -> WikiPage {
    let doc = Html::parse_fragment(html);
    let container = doc.select(&PARSER_OUTPUT).next().unwrap_or_else(|| doc.root_element());
    let mut page = WikiPage {
        game_ids: game_ids(&doc),
        ..WikiPage::default()
    };

    let mut block = Block::Other;
    let mut section: Option<&'static str> = None;
    let mut subheading = String::new();

    for el in container.children().filter_map(ElementRef::wrap) {
        if let Some((level, text)) = heading(el) {
            if level == 2 {
                block = block_for_heading(&text);
                section = None;
                subheading.clear();
            } else if block == Block::Configuration {
                section = section_for_heading(&text);
            } else {
                subheading = text;
            }
            continue;
        }
        match (block, el.value().name()) {
            (Block::Configuration, "table") => {
                if let Some(section) = section {
                    read_config_table(el, section, &mut page);
                }
            }
            (Block::Configuration, "ul" | "ol") => {
                let Some(section) = section else { continue };
                for li in el.children().filter_map(ElementRef::wrap).filter(|c| c.value().name() == "li") {
                    let text = text_of(li);
                    if let Some((left, right)) = text.split_once(':') {
                        let value = parse_option_value(right).unwrap_or(Value::Null);
                        if let Some(entries) = section_entry(&mut page.settings, section) {
                            entries.insert(normalize_setting_key(left), value);
                        }
                    }
                }
            }
            (Block::KnownIssues, "ul" | "ol") => {
                for li in el.select(&LI) {
                    push_unique(&mut page.known_issues, &subheading, &text_of(li));
                }
            }
            (Block::KnownIssues, "p") => push_unique(&mut page.known_issues, &subheading, &text_of(el)),
            (Block::Notes, "ul" | "ol") => {
                for li in el.select(&LI) {
                    push_unique(&mut page.notes, &subheading, &text_of(li));
                }
            }
            (Block::Notes, "p") => push_unique(&mut page.notes, &subheading, &text_of(el)),
            _ => {}
        }
    }

    page.settings.retain(|_, v| v.as_object().is_some_and(|o| !o.is_empty()));
    page.setting_notes.retain(|_, v| v.as_object().is_some_and(|o| !o.is_empty()));
    page
}

fn api_url(params: &[(&str, &str)]) -> Result<String> {
    reqwest::Url::parse_with_params(WIKI_API, params)
        .map(|u| u.to_string())
        .map_err(|e| IngestError::Config(format!("wiki API URL: {e}")))
}

pub fn query_url(title: &str) -> Result<String> {
    api_url(&[("action", "query"), ("titles", title), ("format", "json")])
}

pub fn search_url(title: &str) -> Result<String> {
    let phrase = format!("\"{title}\"");
    api_url(&[
        ("action", "query"),
        ("list", "search"),
        ("srsearch", phrase.as_str()),
        ("srlimit", "1"),
        ("format", "json"),
    ])
}

pub fn parse_url(page_title: &str) -> Result<String> {
    api_url(&[
        ("action", "parse"),
        ("page", page_title),
        ("prop", "text|sections"),
        ("format", "json"),
        ("redirects", "1"),
        ("disablelimitreport", "1"),
        ("disableeditsection", "1"),
    ])
}

/// Public page URL (`index.php?title=Demon%27s_Souls`).
pub fn page_url(page_title: &str) -> String {
    let slug = page_title.replace(' ', "_");
    let index = format!("{WIKI_BASE}/index.php");
    reqwest::Url::parse_with_params(&index, &[("title", slug.as_str())])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{index}?title={slug}"))
}

pub struct Rpcs3WikiSettings {
    pub min_status: String,
    /// Pause after each page fetched from the network
    pub request_delay: Duration,
}

impl Default for Rpcs3WikiSettings {
    fn default() -> Self {
        Self {
            min_status: DEFAULT_MIN_STATUS.to_string(),
            request_delay: Duration::from_millis(350),
        }
    }
}

impl Rpcs3WikiSettings {
    fn fetch_json(&self, ctx: &IngestContext<'_>, url: &str) -> Result<Value> {
        let outcome = ctx.fetch(url)?;
        if !outcome.from_cache && !self.request_delay.is_zero() {
            std::thread::sleep(self.request_delay);
        }
        Ok(serde_json::from_slice(&outcome.content)?)
    }

    /// Existing page for an export title: exact lookup first, then the top search hit.
    pub fn resolve_page_title(&self, ctx: &IngestContext<'_>, title: &str) -> Result<Option<String>> {
        let query = self.fetch_json(ctx, &query_url(title)?)?;
        let exact = query
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|pages| pages.values())
            .filter(|page| page.get("missing").is_none() && page.get("invalid").is_none())
            .find_map(|page| page.get("title").and_then(Value::as_str).map(str::to_string));
        if exact.is_some() {
            return Ok(exact);
        }
        let search = self.fetch_json(ctx, &search_url(title)?)?;
        Ok(search
            .pointer("/query/search/0/title")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Rendered HTML and display title of a page; API errors mean no page.
    pub fn fetch_page(&self, ctx: &IngestContext<'_>, page_title: &str) -> Result<Option<(String, String)>> {
        let data = self.fetch_json(ctx, &parse_url(page_title)?)?;
        if let Some(err) = data.get("error") {
            debug!(page = page_title, "parse API error: {}", err);
            return Ok(None);
        }
        let Some(html) = data.pointer("/parse/text/*").and_then(Value::as_str) else {
            return Ok(None);
        };
        let title = data
            .pointer("/parse/title")
            .and_then(Value::as_str)
            .unwrap_or(page_title)
            .to_string();
        Ok(Some((title, html.to_string())))
    }

    pub fn build_document(&self, games: &[GameRef], ctx: &IngestContext<'_>) -> Result<SettingsDocument> {
        let descriptor = settings_descriptor(
            SOURCE_ID,
            "RPCS3 Wiki",
            WIKI_BASE,
            "ps3",
            "rpcs3",
            "ps3-serial",
            IdConvention::Serial { dashed: false },
        )
        .with_confidence(Confidence::Medium);
        let rules = apply_rules();
        let normalizer = Rpcs3.normalizer();
        let builder = SettingsBuilder::new(&descriptor, &rules, SETTINGS_FORMAT).with_rating(&normalizer);

        let mut report = BuildReport::default();
        let mut items = Vec::new();
        let mut matched_pages = 0;
        for (i, game) in games.iter().enumerate() {
            if i > 0 && i % 50 == 0 {
                info!(processed = i, total = games.len(), items = items.len(), "wiki progress");
            }
            let page = match self
                .resolve_page_title(ctx, &game.title)
                .and_then(|resolved| match resolved {
                    Some(resolved) => self.fetch_page(ctx, &resolved).map(|p| p.map(|p| (resolved, p))),
                    None => Ok(None),
                }) {
                Ok(Some(page)) => page,
                Ok(None) => {
                    debug!(title = %game.title, "no wiki page");
                    continue;
                }
                Err(e) => {
                    warn!(title = %game.title, error = %e, "wiki lookup failed");
                    continue;
                }
            };
            let (resolved, (display_title, html)) = page;
            matched_pages += 1;

            let parsed = parse_page(&html);
            if !parsed.is_meaningful() {
                continue;
            }
            let ids = if parsed.game_ids.is_empty() {
                vec![game.serial.clone()]
            } else {
                parsed.game_ids.clone()
            };
            for id in ids {
                let draft = SettingsDraft {
                    record_path: format!("{resolved}#{id}"),
                    external_game_id: id,
                    title: Some(display_title.clone()),
                    settings: parsed.settings.clone(),
                    compat_raw: game.status.clone(),
                    notes: (!parsed.notes.is_empty()).then(|| parsed.notes.join(" ")),
                    source_url: Some(page_url(&resolved)),
                    known_issues: parsed.known_issues.clone(),
                    setting_notes: parsed.setting_notes.clone(),
                    ..SettingsDraft::default()
                };
                if let Some(item) = builder.build(draft, &mut report) {
                    items.push(item);
                }
            }
        }
        report.finish(SOURCE_ID);
        info!(games = games.len(), pages = matched_pages, items = items.len(), "wiki pages read");
        finish_settings(SOURCE_ID, WIKI_BASE, items, games.len(), ctx)
    }
}

impl IngestSource for Rpcs3WikiSettings {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn schema_version(&self) -> &'static str {
        SETTINGS_SCHEMA_VERSION
    }

    #[instrument(skip(self, ctx), fields(source = SOURCE_ID))]
    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument> {
        let export: Value = serde_json::from_str(&ctx.fetch_text(EXPORT_URL)?)?;
        let all = games_from_export(&export);
        let games: Vec<GameRef> = all
            .iter()
            .filter(|g| meets_min_status(g, &self.min_status))
            .cloned()
            .collect();
        info!(exported = all.len(), kept = games.len(), min_status = %self.min_status, "games from export");
        // Every game costs several wiki requests, so the limit applies before lookups
        let games = ctx.options.apply_limit(games);
        self.build_document(&games, ctx).map(OutputDocument::Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<div class="mw-parser-output">
<table class="infobox"><tr><th>Developer(s)</th><td>FromSoftware</td></tr>
<tr><th>GameID(s)</th><td><a>BLUS30443</a> <a>BCES00664</a></td></tr></table>
<p>Intro text mentioning NPUB30910 outside the infobox.</p>
<h2><span class="mw-headline" id="Configuration">Configuration</span></h2>
<h3><span class="mw-headline">CPU configuration</span></h3>
<table><tr><th>Setting</th><th>Option</th><th>Notes</th></tr>
<tr><td>Preferred SPU Threads</td><td>2</td><td>Fixes stutter</td></tr>
<tr><td>SPU Block Size</td><td>Mega</td><td></td></tr></table>
<h3>GPU configuration</h3>
<table><tr><td>Resolution Scale</td><td>150%</td></tr>
<tr><td>Write Color Buffers</td><td>On</td></tr>
<tr><td>Anisotropic Filter (AF)</td><td>Disabled</td></tr></table>
<h3>Network configuration</h3>
<ul><li>Network Status: Connected</li></ul>
<h2>Known Issues</h2>
<h3>Graphics</h3>
<ul><li>Shadows flicker.</li><li>Shadows flicker.</li></ul>
<h2>Special Notes</h2>
<p>Install the latest patch.</p>
</div>"#;

    #[test]
    fn test_page_configuration_issues_and_ids() {
        let page = parse_page(PAGE);
        assert_eq!(page.game_ids, vec!["BCES00664", "BLUS30443"]);
        assert_eq!(page.settings["cpu"]["preferredSpuThreads"], json!(2));
        assert_eq!(page.settings["cpu"]["spuBlockSize"], json!("Mega"));
        assert_eq!(page.settings["gpu"]["resolutionScale"], json!(150));
        assert_eq!(page.settings["gpu"]["writeColorBuffers"], json!(true));
        assert_eq!(page.settings["gpu"]["anisotropicFilter"], json!("Disabled"));
        assert_eq!(page.settings["network"]["networkStatus"], json!("Connected"));
        assert!(page.settings.get("io").is_none());
        assert_eq!(page.setting_notes["cpu"]["preferredSpuThreads"], json!("Fixes stutter"));
        assert!(page.setting_notes.get("gpu").is_none());
        assert_eq!(page.known_issues, vec!["Graphics: Shadows flicker."]);
        assert_eq!(page.notes, vec!["Install the latest patch."]);
        assert_eq!(apply_rules().classify(&page.settings, None), crate::schema::ApplyMode::Suggested);
    }

    #[test]
    fn test_wrapped_headings_and_page_text_ids() {
        let html = r#"<div class="mw-parser-output">
<p>Serials: NPUB30910, NPEB01234</p>
<div class="mw-heading mw-heading2"><h2 id="Configuration">Configuration</h2></div>
<div class="mw-heading mw-heading3"><h3>Recommended patches</h3></div>
<table><tr><td>60 FPS</td><td>Enabled</td></tr></table>
</div>"#;
        let page = parse_page(html);
        assert_eq!(page.game_ids, vec!["NPEB01234", "NPUB30910"]);
        assert_eq!(page.settings["patches"]["60Fps"], json!(true));
        assert_eq!(apply_rules().classify(&page.settings, None), crate::schema::ApplyMode::Required);
    }

    #[test]
    fn test_section_headings_match_whole_words() {
        assert_eq!(section_for_heading("Network configuration"), Some("network"));
        assert_eq!(section_for_heading("I/O configuration"), Some("io"));
        assert_eq!(section_for_heading("Audio"), Some("audio"));
        assert_eq!(section_for_heading("Emulator"), None);
    }

    #[test]
    fn test_option_values() {
        assert_eq!(parse_option_value("Off"), Some(json!(false)));
        assert_eq!(parse_option_value("100ms"), Some(json!(100)));
        assert_eq!(parse_option_value("1.5"), Some(json!(1.5)));
        assert_eq!(parse_option_value("Vulkan"), Some(json!("Vulkan")));
        assert_eq!(parse_option_value("  "), None);
        assert_eq!(normalize_setting_key("Strict_Rendering Mode"), "strictRenderingMode");
        assert_eq!(normalize_setting_key("Driver Wake-Up Delay (µs)"), "driverWakeUpDelay");
    }

    #[test]
    fn test_export_games_and_status_filter() {
        let export = json!({"return_code": 0, "results": {
            "BLUS30443": {"title": "Demon's Souls", "status": "Playable"},
            "NPUB30024": {"title": "flOw", "status": "Intro"},
            "BLES00001": {"status": "Ingame"},
            "NPEB00001": {"title": "Unrated"}
        }});
        let games = games_from_export(&export);
        assert_eq!(games.len(), 3);
        let kept: Vec<&str> = games
            .iter()
            .filter(|g| meets_min_status(g, DEFAULT_MIN_STATUS))
            .map(|g| g.serial.as_str())
            .collect();
        assert_eq!(kept, vec!["BLUS30443", "NPEB00001"]);
        assert!(games.iter().all(|g| meets_min_status(g, "Whatever")));
    }

    #[test]
    fn test_api_urls_are_encoded() {
        let url = query_url("Demon's Souls").unwrap();
        assert!(url.starts_with("https://wiki.rpcs3.net/api.php?action=query&titles=Demon%27s+Souls"));
        assert_eq!(page_url("Demon's Souls"), "https://wiki.rpcs3.net/index.php?title=Demon%27s_Souls");
    }
}
