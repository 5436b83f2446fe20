//! Xenia (Xbox 360) game-compatibility repository, read through the GitHub issues API.
//!
//! One issue per title; the 8-hex title id sits in the issue title and the state in its labels.

use super::compat::CompatAdapter;
use super::IngestContext;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor};
use crate::error::Result;
use crate::normalize::{CompatStatus, KeywordRules, Normalized, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const REPO_URL: &str = "https://github.com/xenia-canary/game-compatibility";
pub const ISSUES_API: &str = "https://api.github.com/repos/xenia-canary/game-compatibility/issues";
pub const PER_PAGE: usize = 100;
pub const ID_TYPE: &str = "title_id";
pub const ISSUE_ID_TYPE: &str = "issue";

static TITLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9A-Fa-f]{8}\b").expect("valid regex"));

pub fn issues_page_url(page: usize) -> String {
    format!("{ISSUES_API}?state=open&per_page={PER_PAGE}&page={page}")
}

pub fn title_id_in(issue_title: &str) -> Option<String> {
    TITLE_ID.find(issue_title).map(|m| m.as_str().to_ascii_uppercase())
}

/// Turns one page of issues into candidates; pull requests are skipped.
pub fn candidates_from_issues(page: usize, issues: &[Value]) -> Vec<CandidateRecord> {
    issues
        .iter()
        .enumerate()
        .filter(|(_, issue)| issue.get("pull_request").is_none())
        .filter_map(|(i, issue)| {
            let mut record = CandidateRecord::from_value(format!("page[{page}][{i}]"), issue)?;
            let labels = issue
                .get("labels")
                .and_then(Value::as_array)
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|l| l.get("name").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            record.insert("_labels", labels);
            Some(record)
        })
        .collect()
}

pub struct Xenia;

impl CompatAdapter for Xenia {
    fn id(&self) -> &'static str {
        "xenia"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Xenia Canary Game Compatibility".into(),
                kind: SourceKind::Official,
                url: REPO_URL.into(),
                hardware_scope: None,
            },
            "xbox360",
            "xenia",
            ID_TYPE,
            IdConvention::HexTitleId {
                digits: 8,
                uppercase: true,
            },
        )
    }

    /// Labels name a single state, so the first matching rule wins in best-first order.
    fn normalizer(&self) -> StatusNormalizer {
        let rules = KeywordRules::new()
            .rule(Normalized::from(CompatStatus::Perfect), &["perfect"])
            .rule(Normalized::from(CompatStatus::Playable), &["playable"])
            .rule(Normalized::from(CompatStatus::Ingame), &["in-game", "ingame", "gameplay"])
            .rule(Normalized::from(CompatStatus::Intro), &["intro", "menu"])
            .rule(Normalized::from(CompatStatus::Boot), &["load"])
            .rule(
                Normalized::from(CompatStatus::Broken),
                &["nothing", "broken", "won't boot", "wont boot"],
            );
        StatusNormalizer::new(Vocabulary::new(), rules)
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(XeniaResolver)
    }

    fn collect_candidates(&self, ctx: &IngestContext<'_>) -> Result<Vec<CandidateRecord>> {
        let mut candidates = Vec::new();
        for page in 1..=ctx.options.max_pages.max(1) {
            let text = ctx.fetch_text(&issues_page_url(page))?;
            let issues: Vec<Value> = match serde_json::from_str::<Value>(&text)? {
                Value::Array(items) => items,
                other => {
                    debug!(page, "issues page is not a list: {}", other);
                    break;
                }
            };
            if issues.is_empty() {
                break;
            }
            candidates.extend(candidates_from_issues(page, &issues));
            if issues.len() < PER_PAGE {
                break;
            }
        }
        info!(issues = candidates.len(), "collected xenia issues");
        Ok(candidates)
    }
}

struct XeniaResolver;

impl FieldResolver for XeniaResolver {
    /// Title id from the issue title, else the issue number.
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        let title = candidate.text("title").unwrap_or_default();
        match title_id_in(&title) {
            Some(value) => Some(Identity {
                id_type: ID_TYPE.into(),
                value,
            }),
            None => candidate.text("number").map(|value| Identity {
                id_type: ISSUE_ID_TYPE.into(),
                value,
            }),
        }
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text("title")
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text("_labels")
    }

    fn resolve_meta(&self, candidate: &CandidateRecord) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        if let Some(updated) = candidate.text("updated_at") {
            meta.insert("lastUpdated".into(), Value::String(updated));
        }
        if let Some(number) = candidate.get("number").filter(|v| v.is_number()) {
            meta.insert("issue".into(), number.clone());
        }
        Some(meta)
    }

    fn resolve_detail_url(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text("html_url")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_id_is_uppercased() {
        assert_eq!(title_id_in("4d5307e6 - Halo 3").as_deref(), Some("4D5307E6"));
        assert_eq!(title_id_in("Halo 3"), None);
    }

    #[test]
    fn test_pull_requests_are_skipped() {
        let issues = vec![
            json!({"number": 1, "title": "4D5307E6 - Halo 3", "labels": [{"name": "state-playable"}, {"name": "gpu-flicker"}]}),
            json!({"number": 2, "title": "Bump deps", "pull_request": {}, "labels": []}),
        ];
        let candidates = candidates_from_issues(1, &issues);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text("_labels").as_deref(), Some("state-playable, gpu-flicker"));
    }

    #[test]
    fn test_label_states() {
        let n = Xenia.normalizer();
        assert_eq!(n.status("state-playable, gpu-flicker"), CompatStatus::Playable);
        assert_eq!(n.status("state-menus"), CompatStatus::Intro);
        assert_eq!(n.status("state-nothing"), CompatStatus::Broken);
        assert_eq!(n.status("state-load"), CompatStatus::Boot);
        assert_eq!(n.status("help wanted"), CompatStatus::Unknown);
    }

    #[test]
    fn test_identity_falls_back_to_issue_number() {
        let c = CandidateRecord::from_value("page[1][0]", &json!({"number": 77, "title": "Unknown title"})).unwrap();
        let identity = XeniaResolver.resolve_identity(&c).unwrap();
        assert_eq!(identity.id_type, ISSUE_ID_TYPE);
        assert_eq!(identity.value, "77");
    }
}
