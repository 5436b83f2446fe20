use crate::types::normalize_key;
use serde_json::Value;

/// Canonical field names the rest of the pipeline reads candidates by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Title,
    Status,
    Platform,
    Id,
    Notes,
    Emulator,
    Version,
    Region,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Title => "title",
            CanonicalField::Status => "status",
            CanonicalField::Platform => "platform",
            CanonicalField::Id => "id",
            CanonicalField::Notes => "notes",
            CanonicalField::Emulator => "emulator",
            CanonicalField::Version => "version",
            CanonicalField::Region => "region",
        }
    }
}

/// Accepted upstream spellings for each canonical field.
#[derive(Debug, Clone, Default)]
pub struct FieldSynonyms {
    groups: Vec<(CanonicalField, Vec<String>)>,
}

impl FieldSynonyms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the synonym group for `field`. Group order is resolution order.
    pub fn with(mut self, field: CanonicalField, synonyms: &[&str]) -> Self {
        let list: Vec<String> = synonyms.iter().map(|s| normalize_key(s)).collect();
        match self.groups.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = list,
            None => self.groups.push((field, list)),
        }
        self
    }

    /// Spellings seen across compatibility lists and community sheets.
    pub fn standard() -> Self {
        Self::new()
            .with(
                CanonicalField::Id,
                &["serial", "title id", "titleid", "title_id", "game id", "gameid", "game_id", "tid", "id"],
            )
            .with(
                CanonicalField::Title,
                &["title", "name", "game", "game name", "game title", "gametitle", "game_name"],
            )
            .with(
                CanonicalField::Status,
                &["status", "compatibility", "compat", "rating", "playability", "state", "performance", "tier"],
            )
            .with(CanonicalField::Platform, &["platform", "system", "console"])
            .with(CanonicalField::Notes, &["notes", "note", "comments", "comment", "details"])
            .with(CanonicalField::Emulator, &["emulator", "emu", "core"])
            .with(CanonicalField::Version, &["version", "emulator version", "build"])
            .with(CanonicalField::Region, &["region"])
    }

    pub fn synonyms(&self, field: CanonicalField) -> &[String] {
        self.groups
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }

    /// Maps a header or key to its canonical field.
    /// Exact matches across every group win over substring matches; short synonyms never match as substrings.
    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        let h = normalize_key(header);
        if h.is_empty() {
            return None;
        }
        self.groups
            .iter()
            .find(|(_, syns)| syns.iter().any(|s| *s == h))
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|(_, syns)| syns.iter().any(|s| s.len() >= 4 && h.contains(s.as_str())))
            })
            .map(|(f, _)| *f)
    }

    fn matches_exactly(&self, field: CanonicalField, key: &str) -> bool {
        let k = normalize_key(key);
        self.synonyms(field).iter().any(|s| *s == k)
    }

    /// A row "looks like a header" when it names at least two distinct fields and is short.
    pub fn looks_like_header(&self, cells: &[String]) -> bool {
        let joined: usize = cells.iter().map(|c| c.len()).sum();
        if joined == 0 || joined > 120 {
            return false;
        }
        let mut hits: Vec<CanonicalField> = Vec::new();
        for cell in cells {
            if let Some(f) = self.resolve(cell) {
                if !hits.contains(&f) {
                    hits.push(f);
                }
            }
        }
        hits.len() >= 2
    }
}

/// What an array element must look like to count as a record.
#[derive(Debug, Clone)]
pub struct RecordShape {
    pub groups: Vec<CanonicalField>,
    /// Distinct groups an element must carry
    pub min_groups: usize,
    /// Share of record-like elements that qualifies a short array
    pub min_ratio: f64,
    /// Elements inspected per array
    pub sample: usize,
}

impl Default for RecordShape {
    fn default() -> Self {
        Self {
            groups: vec![
                CanonicalField::Title,
                CanonicalField::Status,
                CanonicalField::Platform,
                CanonicalField::Id,
            ],
            min_groups: 2,
            min_ratio: 0.8,
            sample: 30,
        }
    }
}

impl RecordShape {
    pub fn with_min_groups(mut self, min_groups: usize) -> Self {
        self.min_groups = min_groups;
        self
    }

    fn group_hits(&self, obj: &serde_json::Map<String, Value>, synonyms: &FieldSynonyms) -> usize {
        self.groups
            .iter()
            .filter(|field| obj.keys().any(|k| synonyms.matches_exactly(**field, k)))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayScore {
    pub sampled: usize,
    pub hits: usize,
    /// hits per thousand sampled, kept integral for deterministic comparison
    pub ratio_permille: u32,
    pub len: usize,
}

impl ArrayScore {
    pub fn is_acceptable(&self, shape: &RecordShape) -> bool {
        if self.hits == 0 {
            return false;
        }
        self.hits >= absolute_threshold(self.len)
            || f64::from(self.ratio_permille) >= shape.min_ratio * 1000.0
    }

    /// Ordering key: higher ratio, then more hits.
    pub fn rank(&self) -> (u32, usize) {
        (self.ratio_permille, self.hits)
    }
}

/// Record-like hits needed regardless of ratio: at least 3, at most 10, else a quarter of the array.
pub fn absolute_threshold(len: usize) -> usize {
    (len / 4).clamp(3, 10)
}

pub fn score_array(items: &[Value], synonyms: &FieldSynonyms, shape: &RecordShape) -> ArrayScore {
    let sampled: Vec<&Value> = items.iter().take(shape.sample).collect();
    let hits = sampled
        .iter()
        .filter_map(|v| v.as_object())
        .filter(|obj| shape.group_hits(obj, synonyms) >= shape.min_groups)
        .count();
    let ratio_permille = if sampled.is_empty() {
        0
    } else {
        (hits * 1000 / sampled.len()) as u32
    };
    ArrayScore {
        sampled: sampled.len(),
        hits,
        ratio_permille,
        len: items.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_prefers_exact_over_substring() {
        let s = FieldSynonyms::standard();
        assert_eq!(s.resolve("Title ID"), Some(CanonicalField::Id));
        assert_eq!(s.resolve("  Game   Title "), Some(CanonicalField::Title));
        assert_eq!(s.resolve("Compatibility Status"), Some(CanonicalField::Status));
        assert_eq!(s.resolve("Screenshot"), None);
        assert_eq!(s.resolve("Valid"), None);
    }

    #[test]
    fn test_header_detection_needs_two_fields() {
        let s = FieldSynonyms::standard();
        let header = vec!["Game".to_string(), "Status".to_string(), "Notes".to_string()];
        let data = vec!["Zelda".to_string(), "Playable".to_string()];
        assert!(s.looks_like_header(&header));
        assert!(!s.looks_like_header(&data));
    }

    #[test]
    fn test_threshold_bounds() {
        assert_eq!(absolute_threshold(0), 3);
        assert_eq!(absolute_threshold(20), 5);
        assert_eq!(absolute_threshold(1000), 10);
    }

    #[test]
    fn test_small_array_accepted_by_ratio() {
        let s = FieldSynonyms::standard();
        let shape = RecordShape::default();
        let items = vec![
            json!({"title": "A", "status": "ok"}),
            json!({"title": "B", "status": "bad"}),
        ];
        let score = score_array(&items, &s, &shape);
        assert_eq!(score.hits, 2);
        assert!(score.is_acceptable(&shape));
    }

    #[test]
    fn test_unrelated_array_rejected() {
        let s = FieldSynonyms::standard();
        let shape = RecordShape::default();
        let items: Vec<Value> = (0..50).map(|i| json!({"href": format!("/p/{i}"), "label": "x"})).collect();
        assert!(!score_array(&items, &s, &shape).is_acceptable(&shape));
    }
}
