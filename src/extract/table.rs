use super::synonyms::{CanonicalField, FieldSynonyms};
use crate::types::CandidateRecord;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    is_header: bool,
    link: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Clone)]
struct Row {
    cells: Vec<Cell>,
}

impl Row {
    fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text.clone()).collect()
    }

    fn is_header_row(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.is_header)
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn read_rows(table: ElementRef<'_>) -> Vec<Row> {
    table
        .select(&TR)
        .map(|tr| {
            let cells = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "td" | "th"))
                .map(|el| Cell {
                    text: collapse(&el.text().collect::<Vec<_>>().join(" ")),
                    is_header: el.value().name() == "th",
                    link: el
                        .select(&LINK)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string),
                    hint: el.select(&IMG).next().and_then(|img| {
                        img.value()
                            .attr("title")
                            .or_else(|| img.value().attr("alt"))
                            .map(collapse)
                            .filter(|s| !s.is_empty())
                    }),
                })
                .collect();
            Row { cells }
        })
        .collect()
}

/// Column keys for a header row: canonical names where a synonym resolves, else the header text.
fn layout_from_header(cells: &[String], synonyms: &FieldSynonyms) -> Vec<Option<String>> {
    let mut used: Vec<CanonicalField> = Vec::new();
    cells
        .iter()
        .map(|cell| match synonyms.resolve(cell) {
            Some(field) if !used.contains(&field) => {
                used.push(field);
                Some(field.as_str().to_string())
            }
            _ => {
                let key = crate::types::normalize_key(cell);
                (!key.is_empty()).then_some(key)
            }
        })
        .collect()
}

fn has_identity_column(layout: &[Option<String>]) -> bool {
    layout
        .iter()
        .flatten()
        .any(|k| k == CanonicalField::Title.as_str() || k == CanonicalField::Id.as_str())
}

/// Table strategy over the first `<table>` in the page.
///
/// Header resolution: the first all-`th` row, else a header-looking row within the first
/// `rescan_rows`, else the fixed `positional` layout. Repeated header rows are skipped.
pub fn extract_table(
    html: &str,
    synonyms: &FieldSynonyms,
    positional: &[String],
    rescan_rows: usize,
) -> Vec<CandidateRecord> {
    let doc = Html::parse_document(html);
    let Some(table) = doc.select(&TABLE).next() else {
        return Vec::new();
    };
    let rows = read_rows(table);
    if rows.is_empty() {
        return Vec::new();
    }

    let mut layout: Option<(usize, Vec<Option<String>>)> = rows
        .iter()
        .position(Row::is_header_row)
        .map(|i| (i + 1, layout_from_header(&rows[i].texts(), synonyms)))
        .filter(|(_, l)| has_identity_column(l));

    if layout.is_none() {
        layout = rows
            .iter()
            .take(rescan_rows)
            .position(|r| synonyms.looks_like_header(&r.texts()))
            .map(|i| (i + 1, layout_from_header(&rows[i].texts(), synonyms)))
            .filter(|(_, l)| has_identity_column(l));
    }

    let (start, columns) = match layout {
        Some(found) => found,
        None => {
            debug!("no header row resolved, using positional columns {:?}", positional);
            (0, positional.iter().cloned().map(Some).collect())
        }
    };

    let mut records = Vec::new();
    for (i, row) in rows.iter().enumerate().skip(start) {
        if row.is_header_row() || synonyms.looks_like_header(&row.texts()) {
            continue;
        }
        if row.cells.iter().all(|c| c.text.is_empty() && c.hint.is_none()) {
            continue;
        }
        let mut fields = Map::new();
        for (col, cell) in row.cells.iter().enumerate() {
            if cell.text.is_empty() {
                continue;
            }
            let key = columns
                .get(col)
                .cloned()
                .flatten()
                .unwrap_or_else(|| format!("col{col}"));
            fields.entry(key).or_insert_with(|| Value::String(cell.text.clone()));
        }
        if let Some(link) = row.cells.iter().find_map(|c| c.link.clone()) {
            fields.insert("_link".into(), Value::String(link));
        }
        if let Some(hint) = row.cells.iter().find_map(|c| c.hint.clone()) {
            fields.insert("_status_hint".into(), Value::String(hint));
        }
        fields.insert("_row_text".into(), Value::String(row.texts().join(" ")));
        records.push(CandidateRecord::new(format!("table[0].tr[{i}]"), fields));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional() -> Vec<String> {
        vec!["title".to_string(), "status".to_string()]
    }

    #[test]
    fn test_header_row_maps_synonyms() {
        let html = r#"<table>
            <tr><th>Game ID</th><th>Title</th><th>Rating</th></tr>
            <tr><td>GZLE01</td><td><a href="/compat/GZLE01">Wind Waker</a></td><td>Perfect</td></tr>
            <tr><th>Game ID</th><th>Title</th><th>Rating</th></tr>
            <tr><td>RMCE01</td><td>Mario Kart Wii</td><td>Playable</td></tr>
        </table>"#;
        let records = extract_table(html, &FieldSynonyms::standard(), &positional(), 5);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("id").as_deref(), Some("GZLE01"));
        assert_eq!(records[0].text("title").as_deref(), Some("Wind Waker"));
        assert_eq!(records[0].text("status").as_deref(), Some("Perfect"));
        assert_eq!(records[0].text("_link").as_deref(), Some("/compat/GZLE01"));
        assert_eq!(records[1].record_path, "table[0].tr[3]");
    }

    #[test]
    fn test_headerless_table_uses_positional_layout() {
        let html = "<table><tr><td>Game A</td><td>Playable</td></tr><tr><td>Game B</td><td>Broken</td></tr></table>";
        let records = extract_table(html, &FieldSynonyms::standard(), &positional(), 5);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("title").as_deref(), Some("Game B"));
        assert_eq!(records[1].text("status").as_deref(), Some("Broken"));
    }

    #[test]
    fn test_td_header_found_by_rescan() {
        let html = "<table><tr><td>Legend</td></tr><tr><td>Name</td><td>Status</td></tr><tr><td>Zelda</td><td>Great</td></tr></table>";
        let records = extract_table(html, &FieldSynonyms::standard(), &positional(), 5);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("title").as_deref(), Some("Zelda"));
    }

    #[test]
    fn test_image_title_becomes_status_hint() {
        let html = r#"<table><tr><th>Game</th><th>Rating</th></tr>
            <tr><td>Zelda</td><td><img src="s.png" title="Playable"></td></tr></table>"#;
        let records = extract_table(html, &FieldSynonyms::standard(), &positional(), 5);
        assert_eq!(records[0].text("_status_hint").as_deref(), Some("Playable"));
    }

    #[test]
    fn test_no_table_is_empty() {
        assert!(extract_table("<p>nothing</p>", &FieldSynonyms::standard(), &positional(), 5).is_empty());
    }
}
