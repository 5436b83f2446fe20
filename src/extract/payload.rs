use super::synonyms::{score_array, ArrayScore, FieldSynonyms, RecordShape};
use crate::types::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

static NEXT_DATA: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script#__NEXT_DATA__").expect("valid selector"));
static JSON_SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/json"]"#).expect("valid selector"));
static WINDOW_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.(__INITIAL_STATE__|__NUXT__|__DATA__|__COMPAT__)\s*=\s*(\{.*?\})\s*;\s*</script>")
        .expect("valid regex")
});

/// A JSON blob embedded in a page, labelled by where it was found.
#[derive(Debug, Clone)]
pub struct EmbeddedPayload {
    pub label: String,
    pub value: Value,
}

/// Finds framework state blobs: Next.js data, JSON script tags and `window.X = {...};` assignments.
pub fn discover_payloads(html: &str) -> Vec<EmbeddedPayload> {
    let doc = Html::parse_document(html);
    let mut found = Vec::new();

    for el in doc.select(&NEXT_DATA) {
        let text: String = el.text().collect();
        if let Ok(value) = serde_json::from_str(text.trim()) {
            found.push(EmbeddedPayload {
                label: "__NEXT_DATA__".to_string(),
                value,
            });
        }
    }

    for (i, el) in doc.select(&JSON_SCRIPT).enumerate() {
        if el.value().id() == Some("__NEXT_DATA__") {
            continue;
        }
        let text: String = el.text().collect();
        if let Ok(value) = serde_json::from_str(text.trim()) {
            found.push(EmbeddedPayload {
                label: format!("script[json][{i}]"),
                value,
            });
        }
    }

    for caps in WINDOW_ASSIGN.captures_iter(html) {
        let (Some(name), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        match serde_json::from_str(body.as_str()) {
            Ok(value) => found.push(EmbeddedPayload {
                label: format!("window.{}", name.as_str()),
                value,
            }),
            Err(e) => debug!("window.{} is not plain JSON: {}", name.as_str(), e),
        }
    }

    found
}

/// Every array inside `value`, with a JSON-path-like location.
pub fn collect_arrays<'a>(value: &'a Value, path: String, out: &mut Vec<(String, &'a Vec<Value>)>) {
    match value {
        Value::Array(items) => {
            out.push((path.clone(), items));
            for (i, item) in items.iter().enumerate() {
                collect_arrays(item, format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                collect_arrays(v, format!("{path}.{k}"), out);
            }
        }
        _ => {}
    }
}

/// Highest-scoring acceptable array across the given roots. Ties go to the first seen.
pub fn best_array<'a>(
    roots: &'a [(String, &'a Value)],
    synonyms: &FieldSynonyms,
    shape: &RecordShape,
) -> Option<(String, &'a Vec<Value>, ArrayScore)> {
    let mut best: Option<(String, &'a Vec<Value>, ArrayScore)> = None;
    for (label, root) in roots {
        let mut arrays = Vec::new();
        collect_arrays(*root, label.clone(), &mut arrays);
        for (path, items) in arrays {
            let score = score_array(items, synonyms, shape);
            if !score.is_acceptable(shape) {
                continue;
            }
            let better = match &best {
                Some((_, _, current)) => score.rank() > current.rank(),
                None => true,
            };
            if better {
                best = Some((path, items, score));
            }
        }
    }
    best
}

pub fn records_from_array(path: &str, items: &[Value]) -> Vec<CandidateRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, v)| CandidateRecord::from_value(format!("{path}[{i}]"), v))
        .collect()
}

/// Structured-payload strategy: embedded blobs, then the best record-like array within them.
pub fn extract_payload(html: &str, synonyms: &FieldSynonyms, shape: &RecordShape) -> Vec<CandidateRecord> {
    let payloads = discover_payloads(html);
    if payloads.is_empty() {
        return Vec::new();
    }
    let roots: Vec<(String, &Value)> = payloads.iter().map(|p| (p.label.clone(), &p.value)).collect();
    match best_array(&roots, synonyms, shape) {
        Some((path, items, score)) => {
            debug!(path = %path, hits = score.hits, len = score.len, "payload array selected");
            records_from_array(&path, items)
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_PAGE: &str = r#"<html><body>
        <script id="__NEXT_DATA__" type="application/json">
        {"props":{"pageProps":{
            "nav":[{"href":"/a","label":"A"},{"href":"/b","label":"B"}],
            "games":[
                {"title":"Alpha","status":"Playable","platform":"PS2"},
                {"title":"Beta","status":"Ingame","platform":"PS2"},
                {"title":"Gamma","status":"Perfect","platform":"GC"}
            ]}}}
        </script></body></html>"#;

    #[test]
    fn test_next_data_best_array_selected() {
        let shape = RecordShape::default();
        let records = extract_payload(NEXT_PAGE, &FieldSynonyms::standard(), &shape);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text("title").as_deref(), Some("Alpha"));
        assert!(records[0].record_path.contains("games[0]"));
    }

    #[test]
    fn test_window_assignment_is_discovered() {
        let html = r#"<script>window.__COMPAT__ = {"rows":[{"name":"X","status":"ok"}]};</script>"#;
        let payloads = discover_payloads(html);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].label, "window.__COMPAT__");
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let doc: Value = serde_json::json!({
            "a": [{"title":"1","status":"x"}],
            "b": [{"title":"2","status":"y"}]
        });
        let roots = vec![("$".to_string(), &doc)];
        let (path, _, _) =
            best_array(&roots, &FieldSynonyms::standard(), &RecordShape::default()).unwrap();
        assert_eq!(path, "$.a");
    }

    #[test]
    fn test_page_without_payload_yields_nothing() {
        let records = extract_payload("<html><table></table></html>", &FieldSynonyms::standard(), &RecordShape::default());
        assert!(records.is_empty());
    }
}
