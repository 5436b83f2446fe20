use serde::Serialize;
use serde_json::{Map, Value};

/// Document flavor handed to the extractor; picks the strategy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Yaml,
    Csv,
    Text,
    Ini,
}

/// A loosely-typed record pulled out of an upstream document, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    /// Where in the document this came from (`$.results.BLUS30443`, `table[0].tr[4]`)
    pub record_path: String,
    pub fields: Map<String, Value>,
}

impl CandidateRecord {
    pub fn new(record_path: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            record_path: record_path.into(),
            fields,
        }
    }

    /// Wraps a JSON object; anything else is not a record.
    pub fn from_value(record_path: impl Into<String>, value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self::new(record_path, fields.clone()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Exact key first, then a case/whitespace-insensitive match.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(v) = self.fields.get(key) {
            return Some(v);
        }
        let wanted = normalize_key(key);
        self.fields
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v)
    }

    /// First of `keys` holding a non-empty value.
    pub fn pick<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.get(k.as_ref()))
            .find(|v| !is_empty_value(v))
    }

    /// First of `keys` that renders as non-empty text.
    pub fn pick_text<S: AsRef<str>>(&self, keys: &[S]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.get(k.as_ref()))
            .find_map(value_to_text)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_to_text)
    }
}

/// Lowercase and collapse inner whitespace; used for header and key matching.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Scalars as trimmed text; empty strings, nulls and containers yield `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
            (!collapsed.is_empty()).then_some(collapsed)
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
