use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("fetch failed for {url} after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        status: Option<u16>,
        reason: String,
    },

    #[error("zero records parsed from {context} (tried: {tried})")]
    ZeroRecords { context: String, tried: String },

    #[error("unknown schema version {found:?} in {}", path.display())]
    UnknownSchemaVersion {
        path: PathBuf,
        found: Option<String>,
    },

    #[error("no compat.*.json files to merge ({0})")]
    NoMergeInputs(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML deserialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// True for errors that mean a source's structure drifted rather than a transport failure.
    pub fn is_schema_drift(&self) -> bool {
        matches!(self, IngestError::ZeroRecords { .. })
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// A record had a missing or unparseable sub-field. The record is kept if its identity survived.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MalformedFieldWarning {
    pub record_path: String,
    pub field: &'static str,
    pub detail: String,
}

impl MalformedFieldWarning {
    pub fn new(record_path: impl Into<String>, field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            record_path: record_path.into(),
            field,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for MalformedFieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.field, self.record_path, self.detail)
    }
}
