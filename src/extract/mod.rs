//! Multi-strategy record extraction.
//!
//! Each content kind has an ordered list of strategies. The first strategy whose output
//! is plausible (non-empty, and carrying a title or identifier) wins; when all of them
//! come up empty the extractor fails with `ZeroRecords` instead of returning nothing.

pub mod archive;
pub mod delimited;
pub mod document;
pub mod ini;
pub mod lines;
pub mod payload;
pub mod synonyms;
pub mod table;

pub use synonyms::{CanonicalField, FieldSynonyms, RecordShape};

use crate::error::{IngestError, Result};
use crate::metrics::ExtractMetrics;
use crate::types::{CandidateRecord, ContentKind};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    StructuredPayload,
    Table,
    Lines,
    Delimited,
    Document,
    Ini,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::StructuredPayload => "structured_payload",
            StrategyKind::Table => "table",
            StrategyKind::Lines => "lines",
            StrategyKind::Delimited => "delimited",
            StrategyKind::Document => "document",
            StrategyKind::Ini => "ini",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub strategy: StrategyKind,
    pub records: Vec<CandidateRecord>,
}

/// Per-source extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Used in logs and in the `ZeroRecords` context
    pub label: String,
    pub synonyms: FieldSynonyms,
    pub shape: RecordShape,
    pub line_pattern: Option<Regex>,
    /// Column keys for tables and sheets with no recognizable header
    pub positional_columns: Vec<String>,
    pub header_rescan_rows: usize,
    /// Replaces the default order for the content kind
    pub strategies: Option<Vec<StrategyKind>>,
}

impl ExtractorConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            synonyms: FieldSynonyms::standard(),
            shape: RecordShape::default(),
            line_pattern: None,
            positional_columns: vec![
                CanonicalField::Title.as_str().to_string(),
                CanonicalField::Status.as_str().to_string(),
            ],
            header_rescan_rows: 5,
            strategies: None,
        }
    }

    pub fn synonyms(mut self, synonyms: FieldSynonyms) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn shape(mut self, shape: RecordShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn line_pattern(mut self, pattern: Regex) -> Self {
        self.line_pattern = Some(pattern);
        self
    }

    pub fn positional_columns(mut self, columns: &[&str]) -> Self {
        self.positional_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn header_rescan_rows(mut self, rows: usize) -> Self {
        self.header_rescan_rows = rows;
        self
    }

    pub fn strategies(mut self, strategies: &[StrategyKind]) -> Self {
        self.strategies = Some(strategies.to_vec());
        self
    }
}

pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn strategies_for(&self, kind: ContentKind) -> Vec<StrategyKind> {
        if let Some(order) = &self.config.strategies {
            return order.clone();
        }
        match kind {
            ContentKind::Html => {
                let mut order = vec![StrategyKind::StructuredPayload, StrategyKind::Table];
                if self.config.line_pattern.is_some() {
                    order.push(StrategyKind::Lines);
                }
                order
            }
            ContentKind::Json | ContentKind::Yaml => vec![StrategyKind::Document],
            ContentKind::Csv => vec![StrategyKind::Delimited],
            ContentKind::Text => vec![StrategyKind::Lines],
            ContentKind::Ini => vec![StrategyKind::Ini],
        }
    }

    pub fn extract(&self, content: &str, kind: ContentKind) -> Result<Extraction> {
        let order = self.strategies_for(kind);
        for strategy in &order {
            let records = self.run(*strategy, content, kind);
            if self.is_plausible(*strategy, &records) {
                ExtractMetrics::record_strategy_success(strategy.as_str(), records.len());
                info!(
                    source = %self.config.label,
                    strategy = strategy.as_str(),
                    records = records.len(),
                    "extraction succeeded"
                );
                return Ok(Extraction {
                    strategy: *strategy,
                    records,
                });
            }
            ExtractMetrics::record_strategy_fallthrough(strategy.as_str());
            debug!(
                source = %self.config.label,
                strategy = strategy.as_str(),
                produced = records.len(),
                "strategy produced no plausible records"
            );
        }

        ExtractMetrics::record_zero_records();
        let tried = order.iter().map(StrategyKind::as_str).collect::<Vec<_>>().join(", ");
        warn!(source = %self.config.label, tried = %tried, "zero records extracted");
        Err(IngestError::ZeroRecords {
            context: self.config.label.clone(),
            tried,
        })
    }

    fn run(&self, strategy: StrategyKind, content: &str, kind: ContentKind) -> Vec<CandidateRecord> {
        let cfg = &self.config;
        match strategy {
            StrategyKind::StructuredPayload => payload::extract_payload(content, &cfg.synonyms, &cfg.shape),
            StrategyKind::Table => table::extract_table(
                content,
                &cfg.synonyms,
                &cfg.positional_columns,
                cfg.header_rescan_rows,
            ),
            StrategyKind::Lines => {
                let Some(pattern) = &cfg.line_pattern else {
                    return Vec::new();
                };
                let text_lines = if kind == ContentKind::Html {
                    lines::html_text_lines(content)
                } else {
                    content.lines().map(|l| l.trim().to_string()).collect()
                };
                lines::extract_lines(&text_lines, pattern)
            }
            StrategyKind::Delimited => delimited::extract_delimited(
                content,
                &cfg.synonyms,
                &cfg.positional_columns,
                cfg.header_rescan_rows,
            ),
            StrategyKind::Document => match self.parse_document(content, kind) {
                Some(doc) => document::extract_document(&doc, &cfg.synonyms, &cfg.shape),
                None => Vec::new(),
            },
            StrategyKind::Ini => {
                let doc = ini::parse_game_ini(content);
                if doc.sections.is_empty() {
                    return Vec::new();
                }
                let mut record = CandidateRecord::new("$", serde_json::Map::new());
                if let Some(title) = doc.title {
                    record.insert("title", title);
                }
                record.insert("settings", Value::Object(doc.sections));
                vec![record]
            }
        }
    }

    fn parse_document(&self, content: &str, kind: ContentKind) -> Option<Value> {
        let parsed = if kind == ContentKind::Yaml {
            document::parse_yaml(content)
        } else {
            serde_json::from_str(content.trim_start_matches('\u{feff}')).map_err(IngestError::from)
        };
        match parsed {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(source = %self.config.label, "document did not parse: {}", e);
                None
            }
        }
    }

    /// Non-empty, and at least one record carries a title or an identifier.
    fn is_plausible(&self, strategy: StrategyKind, records: &[CandidateRecord]) -> bool {
        if records.is_empty() {
            return false;
        }
        if strategy == StrategyKind::Ini {
            return true;
        }
        let synonyms = &self.config.synonyms;
        let mut keys: Vec<&str> = vec!["_key"];
        keys.extend(synonyms.synonyms(CanonicalField::Title).iter().map(String::as_str));
        keys.extend(synonyms.synonyms(CanonicalField::Id).iter().map(String::as_str));
        records.iter().any(|r| r.pick_text(&keys).is_some())
    }
}
