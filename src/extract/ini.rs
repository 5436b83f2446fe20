use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(?P<name>[^\]]+)\]$").expect("valid regex"));
static TITLE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s*[A-Z0-9]{4,6}\s*-\s*(?P<title>.+?)\s*$").expect("valid regex"));

/// Key under which non key/value lines of a section are kept, in order.
pub const RAW_LINES_KEY: &str = "__lines__";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    /// From a leading `# GAMEID - Title` comment
    pub title: Option<String>,
    pub sections: Map<String, Value>,
}

/// Tolerant per-game INI parser.
///
/// Key casing is preserved, duplicate keys collect into a list, `#`/`;` comment lines and
/// anything before the first section are ignored, and empty sections are dropped.
pub fn parse_game_ini(content: &str) -> IniDocument {
    let content = content.trim_start_matches('\u{feff}');
    let title = content
        .lines()
        .take(10)
        .map(str::trim)
        .filter(|l| l.starts_with('#'))
        .find_map(|l| TITLE_COMMENT.captures(l).map(|c| c["title"].trim().to_string()))
        .filter(|t| !t.is_empty());

    let mut sections: Map<String, Value> = Map::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = SECTION.captures(line) {
            let name = caps["name"].trim().to_string();
            sections
                .entry(name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = Some(name);
            continue;
        }
        let Some(section) = current.as_ref() else {
            continue;
        };
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some(Value::Object(entries)) = sections.get_mut(section) else {
            continue;
        };
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                let key = key.trim().to_string();
                let value = Value::String(value.trim().to_string());
                match entries.get_mut(&key) {
                    Some(Value::Array(list)) => list.push(value),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, value]);
                    }
                    None => {
                        entries.insert(key, value);
                    }
                }
            }
            _ => {
                if let Value::Array(lines) = entries
                    .entry(RAW_LINES_KEY)
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    lines.push(Value::String(line.to_string()));
                }
            }
        }
    }

    sections.retain(|_, v| v.as_object().is_some_and(|o| !o.is_empty()));
    IniDocument { title, sections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "# GALE01 - Super Smash Bros. Melee\n\
        [Core]\n\
        # Values set here will override the main Dolphin settings.\n\
        CPUThread = False\n\
        [OnFrame]\n\
        $Fix crash\n\
        0x80001234:dword:0x60000000\n\
        [Video_Settings]\n\
        SafeTextureCacheColorSamples = 512\n\
        SafeTextureCacheColorSamples = 0\n\
        [EmuState]\n";

    #[test]
    fn test_title_sections_and_raw_lines() {
        let doc = parse_game_ini(SAMPLE);
        assert_eq!(doc.title.as_deref(), Some("Super Smash Bros. Melee"));
        assert_eq!(doc.sections["Core"], json!({"CPUThread": "False"}));
        assert_eq!(
            doc.sections["OnFrame"][RAW_LINES_KEY],
            json!(["$Fix crash", "0x80001234:dword:0x60000000"])
        );
    }

    #[test]
    fn test_duplicate_keys_become_lists_and_empty_sections_drop() {
        let doc = parse_game_ini(SAMPLE);
        assert_eq!(
            doc.sections["Video_Settings"]["SafeTextureCacheColorSamples"],
            json!(["512", "0"])
        );
        assert!(!doc.sections.contains_key("EmuState"));
    }

    #[test]
    fn test_lines_before_first_section_are_ignored() {
        let doc = parse_game_ini("Stray = 1\n[Core]\nMMU = True\n");
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.title.is_none());
    }
}
