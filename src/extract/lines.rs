use crate::types::CandidateRecord;
use regex::Regex;
use scraper::Html;
use serde_json::{Map, Value};

/// Visible text, one line per text node, for pages that publish lists as prose.
pub fn html_text_lines(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.root_element()
        .text()
        .flat_map(|t| t.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies a named-group pattern to each line; non-matching lines are skipped.
pub fn extract_lines(lines: &[String], pattern: &Regex) -> Vec<CandidateRecord> {
    let names: Vec<&str> = pattern.capture_names().flatten().collect();
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = pattern.captures(line)?;
            let mut fields = Map::new();
            for name in &names {
                if let Some(m) = caps.name(name) {
                    let value = m.as_str().trim();
                    if !value.is_empty() {
                        fields.insert((*name).to_string(), Value::String(value.to_string()));
                    }
                }
            }
            (!fields.is_empty()).then(|| CandidateRecord::new(format!("line[{i}]"), fields))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_groups_become_fields() {
        let re = Regex::new(r"^(?P<title>.+?)\s+-\s+(?P<status>\w+)$").unwrap();
        let lines = vec![
            "Day of the Tentacle - Excellent".to_string(),
            "a heading".to_string(),
            "Loom - Good".to_string(),
        ];
        let records = extract_lines(&lines, &re);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("title").as_deref(), Some("Loom"));
        assert_eq!(records[1].record_path, "line[2]");
    }

    #[test]
    fn test_html_text_lines_drop_markup() {
        let lines = html_text_lines("<ul><li>One  </li><li>\n Two</li></ul>");
        assert_eq!(lines, vec!["One".to_string(), "Two".to_string()]);
    }
}
