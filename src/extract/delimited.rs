use super::synonyms::FieldSynonyms;
use crate::types::{normalize_key, CandidateRecord};
use serde_json::{Map, Value};
use std::mem::take;
use tracing::debug;

/// Quote-aware row splitter tolerant of CRLF and a missing trailing newline.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    row.push(field);
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }
    rows
}

fn resolve_columns(header: &[String], synonyms: &FieldSynonyms) -> Vec<String> {
    let mut used = Vec::new();
    header
        .iter()
        .enumerate()
        .map(|(i, h)| match synonyms.resolve(h) {
            Some(f) if !used.contains(&f) => {
                used.push(f);
                f.as_str().to_string()
            }
            _ => {
                let key = normalize_key(h);
                if key.is_empty() {
                    format!("col{i}")
                } else {
                    key
                }
            }
        })
        .collect()
}

/// Delimited-text strategy: header by synonym, else a header-looking row near the top, else positional.
pub fn extract_delimited(
    text: &str,
    synonyms: &FieldSynonyms,
    positional: &[String],
    rescan_rows: usize,
) -> Vec<CandidateRecord> {
    let rows = parse_rows(text.trim_start_matches('\u{feff}'), ',');
    if rows.is_empty() {
        return Vec::new();
    }

    let header_idx = if synonyms.looks_like_header(&rows[0]) {
        Some(0)
    } else {
        rows.iter()
            .take(rescan_rows)
            .position(|r| synonyms.looks_like_header(r))
    };
    let (start, columns) = match header_idx {
        Some(i) => (i + 1, resolve_columns(&rows[i], synonyms)),
        None => {
            debug!("no header row in delimited text, using positional columns");
            (0, positional.to_vec())
        }
    };

    rows.iter()
        .enumerate()
        .skip(start)
        .filter(|(_, r)| r.iter().any(|c| !c.trim().is_empty()))
        .filter(|(_, r)| !synonyms.looks_like_header(r))
        .map(|(i, r)| {
            let mut fields = Map::new();
            for (col, cell) in r.iter().enumerate() {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let key = columns.get(col).cloned().unwrap_or_else(|| format!("col{col}"));
                fields.entry(key).or_insert_with(|| Value::String(cell.to_string()));
            }
            CandidateRecord::new(format!("row[{i}]"), fields)
        })
        .collect()
}
