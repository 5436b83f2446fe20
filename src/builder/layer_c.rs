use super::{BuildReport, FieldResolver, SynonymResolver};
use crate::error::MalformedFieldWarning;
use crate::extract::CanonicalField;
use crate::normalize::StatusNormalizer;
use crate::schema::{Confidence, LayerCItem, PerformanceValue};
use crate::types::CandidateRecord;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Maps free-form platform labels ("PlayStation 2", "Wii U (Cemu)") onto platform ids.
#[derive(Debug, Clone, Default)]
pub struct PlatformTokens {
    tokens: HashMap<String, String>,
}

/// Lowercase with everything but ASCII letters and digits removed.
pub fn platform_token(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl PlatformTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, platform_id: &str, aliases: &[&str]) -> Self {
        self.tokens.insert(platform_token(platform_id), platform_id.to_string());
        for alias in aliases {
            self.tokens.insert(platform_token(alias), platform_id.to_string());
        }
        self
    }

    /// Known tokens map to their id; anything else is lowercased as-is.
    pub fn resolve(&self, raw: &str) -> String {
        self.tokens
            .get(&platform_token(raw))
            .cloned()
            .unwrap_or_else(|| raw.trim().to_lowercase())
    }

    pub fn aliases_of(&self, platform_id: &str) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|(_, id)| id.as_str() == platform_id)
            .map(|(token, _)| token.as_str())
            .collect()
    }
}

/// Builds device-scoped community performance items.
pub struct LayerCBuilder<'a> {
    normalizer: &'a StatusNormalizer,
    resolver: &'a SynonymResolver,
    platforms: &'a PlatformTokens,
    default_platform: Option<String>,
    source_url: String,
}

impl<'a> LayerCBuilder<'a> {
    pub fn new(
        normalizer: &'a StatusNormalizer,
        resolver: &'a SynonymResolver,
        platforms: &'a PlatformTokens,
        source_url: &str,
    ) -> Self {
        Self {
            normalizer,
            resolver,
            platforms,
            default_platform: None,
            source_url: source_url.to_string(),
        }
    }

    /// Platform for rows that do not name one (e.g. a per-platform sheet tab).
    pub fn default_platform(mut self, platform_id: &str) -> Self {
        self.default_platform = Some(platform_id.to_string());
        self
    }

    pub fn build(&self, candidate: &CandidateRecord, report: &mut BuildReport) -> Option<LayerCItem> {
        let path = candidate.record_path.as_str();
        let Some(game_title) = self.resolver.resolve_title(candidate) else {
            report.dropped += 1;
            debug!(record_path = path, "dropped: no title");
            return None;
        };
        let platform_id = match self.resolver.resolve_platform(candidate) {
            Some(raw) => self.platforms.resolve(&raw),
            None => match &self.default_platform {
                Some(p) => p.clone(),
                None => {
                    report.dropped += 1;
                    debug!(record_path = path, "dropped: no platform");
                    return None;
                }
            },
        };

        let raw = self.resolver.resolve_status(candidate).unwrap_or_default();
        if raw.is_empty() {
            report.warn(MalformedFieldWarning::new(path, "performance", "no status value"));
        }
        let normalized = self.normalizer.normalize(&raw);

        let mut settings = Map::new();
        if let Some(notes) = self.resolver.resolve_notes(candidate) {
            settings.insert("notes".into(), Value::String(notes));
        }

        report.built += 1;
        Some(LayerCItem {
            platform_id,
            game_title,
            external_game_id: self.resolver.resolve_identity(candidate).map(|i| i.value),
            performance: PerformanceValue {
                raw,
                normalized: normalized.status,
                tier: normalized.tier,
            },
            emulator_id: self.resolver.text(candidate, CanonicalField::Emulator),
            emulator_version: self.resolver.text(candidate, CanonicalField::Version),
            settings,
            confidence: Confidence::Low,
            source_url: self.source_url.clone(),
        })
    }
}
