use super::payload::{best_array, records_from_array};
use super::synonyms::{score_array, FieldSynonyms, RecordShape};
use crate::error::Result;
use crate::types::CandidateRecord;
use serde_json::Value;
use tracing::debug;

/// Keys that commonly wrap the record list in JSON/YAML exports.
pub const WRAPPER_KEYS: &[&str] = &[
    "entries",
    "games",
    "titles",
    "items",
    "results",
    "data",
    "db",
    "compatibility",
    "reports",
];

/// Parses YAML into the JSON value model so both formats walk the same way.
pub fn parse_yaml(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text.trim_start_matches('\u{feff}'))?;
    Ok(yaml_to_json(yaml))
}

/// Non-string mapping keys (numbers, booleans) become their string form; tags are dropped.
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// A keyed map of records (`{"BLUS30443": {...}}`); the key is kept as `_key`.
fn keyed_records(path: &str, map: &serde_json::Map<String, Value>) -> Option<Vec<CandidateRecord>> {
    if map.is_empty() || !map.values().all(Value::is_object) {
        return None;
    }
    Some(
        map.iter()
            .filter_map(|(k, v)| {
                let mut rec = CandidateRecord::from_value(format!("{path}.{k}"), v)?;
                rec.insert("_key", k.clone());
                Some(rec)
            })
            .collect(),
    )
}

/// Known document shapes in order: a bare array, a wrapper key, a keyed map.
fn shaped_candidates(doc: &Value) -> Vec<Vec<CandidateRecord>> {
    let mut sets = Vec::new();
    match doc {
        Value::Array(items) => sets.push(records_from_array("$", items)),
        Value::Object(map) => {
            for key in WRAPPER_KEYS {
                match map.get(*key) {
                    Some(Value::Array(items)) => sets.push(records_from_array(&format!("$.{key}"), items)),
                    Some(Value::Object(inner)) => {
                        if let Some(recs) = keyed_records(&format!("$.{key}"), inner) {
                            sets.push(recs);
                        }
                    }
                    _ => {}
                }
            }
            if let Some(recs) = keyed_records("$", map) {
                sets.push(recs);
            }
        }
        _ => {}
    }
    sets
}

/// Document strategy: the first known shape whose entries look like records, else the
/// best-scoring array anywhere in the document.
pub fn extract_document(doc: &Value, synonyms: &FieldSynonyms, shape: &RecordShape) -> Vec<CandidateRecord> {
    let relaxed = shape.clone().with_min_groups(1);
    for set in shaped_candidates(doc) {
        let values: Vec<Value> = set.iter().map(|r| Value::Object(r.fields.clone())).collect();
        let score = score_array(&values, synonyms, &relaxed);
        if score.is_acceptable(&relaxed) {
            return set;
        }
        debug!(len = set.len(), hits = score.hits, "document shape rejected");
    }

    let roots = vec![("$".to_string(), doc)];
    match best_array(&roots, synonyms, shape) {
        Some((path, items, _)) => records_from_array(&path, items),
        None => Vec::new(),
    }
}
