use super::status::{CompatStatus, Normalized, PerformanceTier};
use std::collections::HashMap;

/// Integer ratings mapped through inclusive bands; a sentinel value means "not rated".
#[derive(Debug, Clone, Default)]
pub struct NumericScale {
    sentinel: Option<i64>,
    bands: Vec<(i64, i64, CompatStatus)>,
}

impl NumericScale {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sentinel(mut self, value: i64) -> Self {
        self.sentinel = Some(value);
        self
    }

    pub fn band(mut self, low: i64, high: i64, status: CompatStatus) -> Self {
        self.bands.push((low, high, status));
        self
    }

    /// Sentinel and out-of-range values are unknown.
    pub fn map(&self, value: i64) -> CompatStatus {
        if self.sentinel == Some(value) {
            return CompatStatus::Unknown;
        }
        self.bands
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&value))
            .map(|(_, _, s)| *s)
            .unwrap_or(CompatStatus::Unknown)
    }
}

/// A source's own status labels, matched case-insensitively after trimming.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    exact: HashMap<String, Normalized>,
    scale: Option<NumericScale>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(self, label: &str, status: CompatStatus) -> Self {
        self.label_with_tier(label, Normalized::from(status))
    }

    pub fn label_with_tier(mut self, label: &str, normalized: Normalized) -> Self {
        self.exact.insert(canonical_label(label), normalized);
        self
    }

    pub fn labels(mut self, labels: &[&str], status: CompatStatus) -> Self {
        for label in labels {
            self = self.label(label, status);
        }
        self
    }

    pub fn scale(mut self, scale: NumericScale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn numeric_scale(&self) -> Option<&NumericScale> {
        self.scale.as_ref()
    }

    pub fn lookup(&self, label: &str) -> Option<Normalized> {
        self.exact.get(&canonical_label(label)).copied()
    }
}

pub fn canonical_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Clone)]
struct KeywordRule {
    outcome: Normalized,
    keywords: Vec<String>,
}

/// Ordered keyword fallback. Rules are listed worst-first so a label mixing good and bad
/// words lands in the worse bucket. Keywords match at the start of a word.
#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    rules: Vec<KeywordRule>,
}

impl KeywordRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, outcome: Normalized, keywords: &[&str]) -> Self {
        self.rules.push(KeywordRule {
            outcome,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        });
        self
    }

    pub fn standard() -> Self {
        Self::new()
            .rule(
                Normalized::from(CompatStatus::Broken),
                &[
                    "unplayable",
                    "broken",
                    "doesn't work",
                    "does not work",
                    "not working",
                    "doesn't boot",
                    "does not boot",
                    "won't boot",
                    "wont boot",
                    "crash",
                    "black screen",
                    "freez",
                    "nothing",
                ],
            )
            .rule(Normalized::from(CompatStatus::Boot), &["boot", "loads", "loadable"])
            .rule(Normalized::from(CompatStatus::Intro), &["intro", "menu"])
            .rule(
                Normalized::from(CompatStatus::Ingame),
                &["ingame", "in-game", "in game", "poor", "bad", "stuttery", "slow", "major issue"],
            )
            .rule(
                Normalized::from(CompatStatus::Playable),
                &["playable", "works", "runs", "ok", "okay", "fine", "minor issue"],
            )
            .rule(
                Normalized::new(CompatStatus::Playable, PerformanceTier::Good),
                &["good", "great"],
            )
            .rule(
                Normalized::from(CompatStatus::Perfect),
                &["perfect", "flawless", "excellent"],
            )
    }

    pub fn classify(&self, canonical: &str) -> Option<Normalized> {
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| contains_at_word_start(canonical, kw)))
            .map(|rule| rule.outcome)
    }
}

fn contains_at_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}
