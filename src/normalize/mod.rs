//! Status normalization into the canonical vocabulary.
//!
//! Resolution order: numeric scale (when the source has one), the source's exact labels,
//! the shared keyword rules, then `unknown`. Every input maps to exactly one bucket.

pub mod status;
pub mod vocab;

pub use status::{CompatStatus, Normalized, PerformanceTier};
pub use vocab::{KeywordRules, NumericScale, Vocabulary};

use vocab::canonical_label;

/// Source-specific normalizer built from immutable tables handed in at construction.
#[derive(Debug, Clone)]
pub struct StatusNormalizer {
    vocabulary: Vocabulary,
    keywords: KeywordRules,
}

impl StatusNormalizer {
    pub fn new(vocabulary: Vocabulary, keywords: KeywordRules) -> Self {
        Self { vocabulary, keywords }
    }

    /// Source labels plus the standard keyword fallback.
    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self::new(vocabulary, KeywordRules::standard())
    }

    pub fn normalize(&self, raw: &str) -> Normalized {
        let label = canonical_label(raw);
        if label.is_empty() {
            return Normalized::UNKNOWN;
        }
        if let Some(scale) = self.vocabulary.numeric_scale() {
            if let Some(value) = parse_integral(&label) {
                return Normalized::from(scale.map(value));
            }
        }
        if let Some(hit) = self.vocabulary.lookup(&label) {
            return hit;
        }
        self.keywords.classify(&label).unwrap_or(Normalized::UNKNOWN)
    }

    pub fn status(&self, raw: &str) -> CompatStatus {
        self.normalize(raw).status
    }
}

/// "3" and "3.0" are integral; "3.5" is not.
fn parse_integral(label: &str) -> Option<i64> {
    if let Ok(v) = label.parse::<i64>() {
        return Some(v);
    }
    let f = label.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dolphin_like() -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("Perfect", CompatStatus::Perfect)
                .label("Playable", CompatStatus::Playable)
                .label("Starts", CompatStatus::Ingame)
                .label("Intro", CompatStatus::Intro)
                .label("Broken", CompatStatus::Broken),
        )
    }

    #[test]
    fn test_exact_labels_win() {
        let n = dolphin_like();
        assert_eq!(n.status("Starts"), CompatStatus::Ingame);
        assert_eq!(n.status("  PLAYABLE "), CompatStatus::Playable);
    }

    #[test]
    fn test_unrecognized_and_empty_are_unknown() {
        let n = dolphin_like();
        assert_eq!(n.normalize(""), Normalized::UNKNOWN);
        assert_eq!(n.normalize("   "), Normalized::UNKNOWN);
        assert_eq!(n.normalize("Purple"), Normalized::UNKNOWN);
    }

    #[test]
    fn test_mixed_keywords_resolve_to_worse_bucket() {
        let n = StatusNormalizer::with_vocabulary(Vocabulary::new());
        assert_eq!(n.status("Perfect until it crashes in chapter 3"), CompatStatus::Broken);
        assert_eq!(n.status("Great, but poor audio"), CompatStatus::Ingame);
        assert_eq!(n.status("Works great"), CompatStatus::Playable);
    }

    #[test]
    fn test_scale_sentinel_and_out_of_range() {
        let n = StatusNormalizer::with_vocabulary(
            Vocabulary::new().scale(
                NumericScale::new()
                    .sentinel(0)
                    .band(1, 1, CompatStatus::Broken)
                    .band(4, 4, CompatStatus::Playable),
            ),
        );
        assert_eq!(n.status("0"), CompatStatus::Unknown);
        assert_eq!(n.status("4"), CompatStatus::Playable);
        assert_eq!(n.status("4.0"), CompatStatus::Playable);
        assert_eq!(n.status("9"), CompatStatus::Unknown);
    }

    #[test]
    fn test_tiers_follow_status() {
        let n = StatusNormalizer::with_vocabulary(Vocabulary::new());
        assert_eq!(n.normalize("excellent").tier, PerformanceTier::Excellent);
        assert_eq!(n.normalize("good").tier, PerformanceTier::Good);
        assert_eq!(n.normalize("unplayable").tier, PerformanceTier::Unplayable);
    }

    #[test]
    fn test_every_status_is_reachable() {
        let n = StatusNormalizer::with_vocabulary(Vocabulary::new());
        let inputs = ["perfect", "playable", "ingame", "intro", "boots", "broken", "??"];
        let got: Vec<CompatStatus> = inputs.iter().map(|s| n.status(s)).collect();
        assert_eq!(got, CompatStatus::ALL.to_vec());
    }
}
