//! Turns candidate records into canonical output records.
//!
//! A candidate becomes a record only if an identity resolves (an identifier, or failing
//! that the title). Anything else that is missing or malformed is reported as a
//! `MalformedFieldWarning` and the record is kept.

pub mod identity;
pub mod layer_c;
pub mod settings;

pub use identity::{IdConvention, IdForm, NAME_ID_TYPE};
pub use layer_c::{platform_token, LayerCBuilder, PlatformTokens};
pub use settings::{ApplyModeRules, ApplyRule, SettingsBuilder, SettingsDraft, SettingsStats};

use crate::constants::UNMAPPED_GAME_ID;
use crate::error::MalformedFieldWarning;
use crate::extract::{CanonicalField, FieldSynonyms};
use crate::metrics::BuildMetrics;
use crate::normalize::StatusNormalizer;
use crate::schema::{CompatibilityRecord, Confidence, Links, SourceInfo, StatusValue};
use crate::types::CandidateRecord;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Static facts about a source that every record it emits inherits.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub info: SourceInfo,
    pub platform_id: String,
    pub emulator_id: String,
    /// Identifier type used when the candidate carries an id (titles fall back to `name`)
    pub external_id_type: String,
    pub id_convention: IdConvention,
    pub confidence: Confidence,
}

impl SourceDescriptor {
    /// Confidence defaults from the source kind.
    pub fn new(
        info: SourceInfo,
        platform_id: &str,
        emulator_id: &str,
        external_id_type: &str,
        id_convention: IdConvention,
    ) -> Self {
        let confidence = Confidence::for_kind(info.kind);
        Self {
            info,
            platform_id: platform_id.to_string(),
            emulator_id: emulator_id.to_string(),
            external_id_type: external_id_type.to_string(),
            id_convention,
            confidence,
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id_type: String,
    pub value: String,
}

/// Source-specific field resolution. Only identity, title and status are required.
pub trait FieldResolver {
    /// Raw identifier and its type; `None` lets the builder fall back to the title
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity>;

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String>;

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String>;

    fn resolve_platform(&self, _candidate: &CandidateRecord) -> Option<String> {
        None
    }

    fn resolve_notes(&self, _candidate: &CandidateRecord) -> Option<String> {
        None
    }

    fn resolve_meta(&self, _candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        None
    }

    fn resolve_detail_url(&self, _candidate: &CandidateRecord) -> Option<String> {
        None
    }
}

/// Data-driven resolver reading canonical fields through synonym lists.
#[derive(Debug, Clone)]
pub struct SynonymResolver {
    synonyms: FieldSynonyms,
    id_type: String,
}

impl SynonymResolver {
    pub fn new(synonyms: FieldSynonyms, id_type: &str) -> Self {
        Self {
            synonyms,
            id_type: id_type.to_string(),
        }
    }

    pub fn synonyms(&self) -> &FieldSynonyms {
        &self.synonyms
    }

    /// The canonical key (as written by table/sheet extraction) followed by its synonyms.
    pub fn keys(&self, field: CanonicalField) -> Vec<String> {
        let mut keys = vec![field.as_str().to_string()];
        keys.extend(self.synonyms.synonyms(field).iter().cloned());
        keys
    }

    pub fn text(&self, candidate: &CandidateRecord, field: CanonicalField) -> Option<String> {
        candidate.pick_text(&self.keys(field))
    }
}

impl FieldResolver for SynonymResolver {
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        let mut keys = self.keys(CanonicalField::Id);
        keys.push("_key".to_string());
        candidate.pick_text(&keys).map(|value| Identity {
            id_type: self.id_type.clone(),
            value,
        })
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.text(candidate, CanonicalField::Title)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.text(candidate, CanonicalField::Status)
            .or_else(|| candidate.text("_status_hint"))
    }

    fn resolve_platform(&self, candidate: &CandidateRecord) -> Option<String> {
        self.text(candidate, CanonicalField::Platform)
    }

    fn resolve_notes(&self, candidate: &CandidateRecord) -> Option<String> {
        self.text(candidate, CanonicalField::Notes)
    }
}

/// Per-run tally of built, dropped and warned-about records.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub built: usize,
    pub dropped: usize,
    pub warnings: Vec<MalformedFieldWarning>,
    /// Settings builds only: how many items each apply-mode rule decided
    pub apply_rules: BTreeMap<&'static str, usize>,
}

impl BuildReport {
    pub fn warn(&mut self, warning: MalformedFieldWarning) {
        debug!("{}", warning);
        self.warnings.push(warning);
    }

    /// Emits the summary log line and the build metrics.
    pub fn finish(&self, source_id: &str) {
        BuildMetrics::record_built(self.built);
        BuildMetrics::record_dropped(self.dropped);
        BuildMetrics::record_warnings(self.warnings.len());
        info!(
            source = source_id,
            built = self.built,
            dropped = self.dropped,
            warnings = self.warnings.len(),
            "records built"
        );
        if !self.apply_rules.is_empty() {
            info!(source = source_id, rules = ?self.apply_rules, "apply mode rules");
        }
        if !self.warnings.is_empty() {
            for w in self.warnings.iter().take(5) {
                warn!(source = source_id, "malformed field: {}", w);
            }
        }
    }
}

/// Canonical external id for a resolved identity; titles are kept as-is.
pub fn canonical_identity(
    convention: &IdConvention,
    identity: &Identity,
    record_path: &str,
    report: &mut BuildReport,
) -> String {
    if identity.id_type == NAME_ID_TYPE {
        return identity.value.clone();
    }
    match convention.normalize(&identity.value) {
        IdForm::Canonical(id) => id,
        IdForm::Preserved(id) => {
            report.warn(MalformedFieldWarning::new(
                record_path,
                "externalGameId",
                format!("'{}' does not match the {} convention", id, identity.id_type),
            ));
            id
        }
    }
}

pub struct RecordBuilder<'a> {
    descriptor: &'a SourceDescriptor,
    normalizer: &'a StatusNormalizer,
    resolver: &'a dyn FieldResolver,
    generated_at: DateTime<Utc>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        descriptor: &'a SourceDescriptor,
        normalizer: &'a StatusNormalizer,
        resolver: &'a dyn FieldResolver,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            descriptor,
            normalizer,
            resolver,
            generated_at,
        }
    }

    pub fn build(&self, candidate: &CandidateRecord, report: &mut BuildReport) -> Option<CompatibilityRecord> {
        let path = candidate.record_path.as_str();
        let title = self.resolver.resolve_title(candidate);
        let identity = self.resolver.resolve_identity(candidate).or_else(|| {
            title.clone().map(|t| Identity {
                id_type: NAME_ID_TYPE.to_string(),
                value: t,
            })
        });
        let Some(identity) = identity else {
            report.dropped += 1;
            debug!(record_path = path, "dropped: no identifier or title");
            return None;
        };
        // The convention only describes the source's primary id type
        let external_game_id = if identity.id_type == self.descriptor.external_id_type {
            canonical_identity(&self.descriptor.id_convention, &identity, path, report)
        } else {
            identity.value.trim().to_string()
        };

        let raw_status = self.resolver.resolve_status(candidate);
        if raw_status.is_none() {
            report.warn(MalformedFieldWarning::new(path, "status", "no status value"));
        }
        let normalized = self.normalizer.normalize(raw_status.as_deref().unwrap_or_default());

        let platform_id = self
            .resolver
            .resolve_platform(candidate)
            .unwrap_or_else(|| self.descriptor.platform_id.clone());

        report.built += 1;
        Some(CompatibilityRecord {
            platform_id,
            emulator_id: self.descriptor.emulator_id.clone(),
            external_id_type: identity.id_type,
            external_game_id,
            game_id: UNMAPPED_GAME_ID.to_string(),
            title,
            status: StatusValue {
                raw: raw_status,
                normalized: normalized.status,
            },
            confidence: self.descriptor.confidence,
            source: self.descriptor.info.clone(),
            generated_at: self.generated_at,
            notes: self.resolver.resolve_notes(candidate),
            meta: self.resolver.resolve_meta(candidate).filter(|m| !m.is_empty()),
            links: Some(Links {
                source: self.descriptor.info.url.clone(),
                detail: self.resolver.resolve_detail_url(candidate),
            }),
        })
    }

    pub fn build_all(&self, candidates: &[CandidateRecord], report: &mut BuildReport) -> Vec<CompatibilityRecord> {
        candidates.iter().filter_map(|c| self.build(c, report)).collect()
    }
}
