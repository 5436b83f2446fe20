use super::{canonical_identity, BuildReport, Identity, SourceDescriptor};
use crate::constants::UNMAPPED_GAME_ID;
use crate::normalize::StatusNormalizer;
use crate::schema::{ApplyMode, SettingsRecord, StatusValue};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::info;

/// Section-based rules deciding how a settings bundle should be applied.
///
/// Checked in order: required core keys, required sections (and patches), a bundle made
/// only of suggested sections, auto sections, then `auto`.
#[derive(Debug, Clone, Default)]
pub struct ApplyModeRules {
    pub core_section: Option<String>,
    pub required_core_keys: Vec<String>,
    pub required_sections: Vec<String>,
    pub patches_required: bool,
    pub suggested_only_sections: Vec<String>,
    /// Ignored when deciding whether a bundle is suggestion-only
    pub meta_sections: Vec<String>,
    pub auto_sections: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(o) => !o.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

impl ApplyModeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(mut self, section: &str, keys: &[&str]) -> Self {
        self.core_section = Some(section.to_string());
        self.required_core_keys = strings(keys);
        self
    }

    pub fn required(mut self, sections: &[&str]) -> Self {
        self.required_sections = strings(sections);
        self
    }

    pub fn patches_required(mut self) -> Self {
        self.patches_required = true;
        self
    }

    pub fn suggested_only(mut self, sections: &[&str]) -> Self {
        self.suggested_only_sections = strings(sections);
        self
    }

    pub fn meta(mut self, sections: &[&str]) -> Self {
        self.meta_sections = strings(sections);
        self
    }

    pub fn auto(mut self, sections: &[&str]) -> Self {
        self.auto_sections = strings(sections);
        self
    }

    pub fn classify(&self, settings: &Map<String, Value>, patches: Option<&Map<String, Value>>) -> ApplyMode {
        self.decide(settings, patches).0
    }

    /// The apply mode together with the rule that produced it.
    pub fn decide(&self, settings: &Map<String, Value>, patches: Option<&Map<String, Value>>) -> (ApplyMode, ApplyRule) {
        if let Some(core) = self.core_section.as_ref().and_then(|s| settings.get(s)).and_then(Value::as_object) {
            if self.required_core_keys.iter().any(|k| core.contains_key(k)) {
                return (ApplyMode::Required, ApplyRule::CoreKey);
            }
        }
        if self
            .required_sections
            .iter()
            .any(|s| settings.get(s).is_some_and(non_empty))
        {
            return (ApplyMode::Required, ApplyRule::RequiredSection);
        }
        if self.patches_required && patches.is_some_and(|p| !p.is_empty()) {
            return (ApplyMode::Required, ApplyRule::Patches);
        }
        let substantive: Vec<&String> = settings
            .keys()
            .filter(|k| !self.meta_sections.contains(*k))
            .collect();
        if !substantive.is_empty()
            && substantive.iter().all(|k| self.suggested_only_sections.contains(*k))
        {
            return (ApplyMode::Suggested, ApplyRule::SuggestedOnly);
        }
        if self.auto_sections.iter().any(|s| settings.contains_key(s)) {
            return (ApplyMode::Auto, ApplyRule::AutoSection);
        }
        (ApplyMode::Auto, ApplyRule::Fallback)
    }
}

/// Which step of the decision order settled an apply mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApplyRule {
    CoreKey,
    RequiredSection,
    Patches,
    SuggestedOnly,
    AutoSection,
    Fallback,
}

impl ApplyRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyRule::CoreKey => "core_key",
            ApplyRule::RequiredSection => "required_section",
            ApplyRule::Patches => "patches",
            ApplyRule::SuggestedOnly => "suggested_only",
            ApplyRule::AutoSection => "auto_section",
            ApplyRule::Fallback => "fallback",
        }
    }
}

/// Settings for one title before identity and apply-mode resolution.
#[derive(Debug, Clone, Default)]
pub struct SettingsDraft {
    pub record_path: String,
    pub external_game_id: String,
    pub title: Option<String>,
    pub platform_id: Option<String>,
    pub settings: Map<String, Value>,
    pub patches: Option<Map<String, Value>>,
    pub compat_raw: Option<String>,
    pub region: Option<String>,
    pub notes: Option<String>,
    /// Per-item URL; defaults to the source URL
    pub source_url: Option<String>,
    pub known_issues: Vec<String>,
    pub setting_notes: Map<String, Value>,
}

pub struct SettingsBuilder<'a> {
    descriptor: &'a SourceDescriptor,
    rules: &'a ApplyModeRules,
    normalizer: Option<&'a StatusNormalizer>,
    settings_format: String,
}

impl<'a> SettingsBuilder<'a> {
    pub fn new(descriptor: &'a SourceDescriptor, rules: &'a ApplyModeRules, settings_format: &str) -> Self {
        Self {
            descriptor,
            rules,
            normalizer: None,
            settings_format: settings_format.to_string(),
        }
    }

    /// Enables `compatRating` from the draft's raw rating.
    pub fn with_rating(mut self, normalizer: &'a StatusNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn build(&self, draft: SettingsDraft, report: &mut BuildReport) -> Option<SettingsRecord> {
        if draft.external_game_id.trim().is_empty() {
            report.dropped += 1;
            return None;
        }
        let identity = Identity {
            id_type: self.descriptor.external_id_type.clone(),
            value: draft.external_game_id.clone(),
        };
        let external_game_id =
            canonical_identity(&self.descriptor.id_convention, &identity, &draft.record_path, report);
        let (apply_mode, rule) = self.rules.decide(&draft.settings, draft.patches.as_ref());
        *report.apply_rules.entry(rule.as_str()).or_default() += 1;
        let compat_rating = self.normalizer.map(|n| StatusValue {
            normalized: n.status(draft.compat_raw.as_deref().unwrap_or_default()),
            raw: draft.compat_raw.clone(),
        });

        report.built += 1;
        Some(SettingsRecord {
            platform_id: draft
                .platform_id
                .unwrap_or_else(|| self.descriptor.platform_id.clone()),
            emulator_id: self.descriptor.emulator_id.clone(),
            external_id_type: identity.id_type,
            external_game_id,
            game_id: UNMAPPED_GAME_ID.to_string(),
            title: draft.title,
            settings: draft.settings,
            patches: draft.patches.filter(|p| !p.is_empty()),
            settings_format: self.settings_format.clone(),
            apply_mode,
            confidence: self.descriptor.confidence,
            source_url: draft
                .source_url
                .unwrap_or_else(|| self.descriptor.info.url.clone()),
            notes: draft.notes,
            compat_rating,
            region: draft.region,
            known_issues: (!draft.known_issues.is_empty()).then_some(draft.known_issues),
            setting_notes: (!draft.setting_notes.is_empty()).then_some(draft.setting_notes),
        })
    }
}

/// Distribution summary logged after a settings run.
#[derive(Debug, Clone, Default)]
pub struct SettingsStats {
    pub entries_seen: usize,
    pub emitted: usize,
    pub with_patches: usize,
    pub apply_modes: BTreeMap<String, usize>,
    pub compat: BTreeMap<String, usize>,
    pub regions: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
}

impl SettingsStats {
    pub fn record(&mut self, item: &SettingsRecord) {
        self.emitted += 1;
        if item.patches.is_some() {
            self.with_patches += 1;
        }
        let mode = serde_json::to_value(item.apply_mode)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        *self.apply_modes.entry(mode).or_default() += 1;
        if let Some(rating) = &item.compat_rating {
            *self.compat.entry(rating.normalized.as_str().to_string()).or_default() += 1;
        }
        if let Some(region) = &item.region {
            *self.regions.entry(region.clone()).or_default() += 1;
        }
        for key in item.settings.keys() {
            *self.categories.entry(key.clone()).or_default() += 1;
        }
    }

    pub fn log(&self, source_id: &str) {
        info!(
            source = source_id,
            entries = self.entries_seen,
            emitted = self.emitted,
            with_patches = self.with_patches,
            apply_modes = ?self.apply_modes,
            compat = ?self.compat,
            "settings summary"
        );
        info!(source = source_id, regions = ?self.regions, categories = ?self.categories, "settings distribution");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dolphin_rules() -> ApplyModeRules {
        ApplyModeRules::new()
            .core("Core", &["CPUThread", "MMU"])
            .required(&["Patch", "Gecko"])
            .suggested_only(&["Video_Enhancements"])
            .meta(&["EmuState"])
            .auto(&["Video_Hacks", "Video_Settings"])
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_core_key() {
        let s = map(json!({"Core": {"MMU": "True"}, "Video_Hacks": {"EFBToTextureEnable": "False"}}));
        assert_eq!(dolphin_rules().classify(&s, None), ApplyMode::Required);
    }

    #[test]
    fn test_enhancements_only_is_suggested() {
        let s = map(json!({"Video_Enhancements": {"ForceFiltering": "False"}, "EmuState": {"EmulationStateId": "4"}}));
        assert_eq!(dolphin_rules().classify(&s, None), ApplyMode::Suggested);
    }

    #[test]
    fn test_hacks_are_auto_and_empty_defaults_auto() {
        let s = map(json!({"Video_Hacks": {"ImmediateXFBEnable": "False"}}));
        assert_eq!(dolphin_rules().decide(&s, None), (ApplyMode::Auto, ApplyRule::AutoSection));
        assert_eq!(dolphin_rules().decide(&Map::new(), None), (ApplyMode::Auto, ApplyRule::Fallback));
        let unknown = map(json!({"Wiimote": {"Source": "1"}}));
        assert_eq!(dolphin_rules().decide(&unknown, None), (ApplyMode::Auto, ApplyRule::Fallback));
    }

    #[test]
    fn test_builder_tallies_deciding_rule() {
        use crate::builder::IdConvention;
        use crate::schema::{SourceInfo, SourceKind};

        let info = SourceInfo {
            id: "dolphin-gameini".into(),
            name: "Dolphin GameSettings".into(),
            kind: SourceKind::Official,
            url: "https://github.com/dolphin-emu/dolphin".into(),
            hardware_scope: None,
        };
        let descriptor = SourceDescriptor::new(info, "gamecube", "dolphin", "dolphin-gameid", IdConvention::ProductCode { len: 6 });
        let rules = dolphin_rules();
        let builder = SettingsBuilder::new(&descriptor, &rules, "dolphin-ini");
        let mut report = BuildReport::default();
        for (id, settings) in [
            ("GZLE01", json!({"Video_Hacks": {"EFBToTextureEnable": "False"}})),
            ("GALE01", json!({"Core": {"CPUThread": "False"}})),
            ("RMGE01", json!({"Video_Hacks": {"ImmediateXFBEnable": "False"}})),
        ] {
            let draft = SettingsDraft {
                external_game_id: id.into(),
                settings: map(settings),
                ..SettingsDraft::default()
            };
            builder.build(draft, &mut report).unwrap();
        }
        assert_eq!(report.apply_rules.get("auto_section"), Some(&2));
        assert_eq!(report.apply_rules.get("core_key"), Some(&1));
    }

    #[test]
    fn test_patches_required_when_enabled() {
        let rules = ApplyModeRules::new().required(&["gameFixes"]).patches_required().auto(&["gsHWFixes"]);
        let settings = map(json!({"gsHWFixes": {"mipmap": 1}}));
        let patches = map(json!({"default": "patch=1,EE,0010,word,0"}));
        assert_eq!(rules.classify(&settings, Some(&patches)), ApplyMode::Required);
        assert_eq!(rules.classify(&settings, None), ApplyMode::Auto);
    }
}
