//! Dolphin (GameCube/Wii) compatibility index at dolphin-emu.org.

use super::absolute_url;
use super::compat::CompatAdapter;
use crate::builder::{FieldResolver, IdConvention, Identity, SourceDescriptor, SynonymResolver};
use crate::extract::FieldSynonyms;
use crate::normalize::{CompatStatus, StatusNormalizer, Vocabulary};
use crate::schema::{SourceInfo, SourceKind};
use crate::types::CandidateRecord;

pub const BASE_URL: &str = "https://dolphin-emu.org";
pub const COMPAT_URL: &str = "https://dolphin-emu.org/compat/";
pub const GAME_ID_TYPE: &str = "dolphin-game-id";

pub struct Dolphin;

/// Wii discs start with R, S, W or H; everything else is treated as GameCube.
pub fn platform_for_game_id(game_id: &str) -> &'static str {
    match game_id.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('R' | 'S' | 'W' | 'H') => "wii",
        _ => "gamecube",
    }
}

/// Six-character Game ID as the last segment of a `/compat/<id>/` link.
fn game_id_from_link(link: &str) -> Option<String> {
    let (_, rest) = link.split_once("/compat/")?;
    let segment = rest.split(['/', '?', '#']).next()?;
    (segment.len() == 6 && segment.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| segment.to_ascii_uppercase())
}

impl CompatAdapter for Dolphin {
    fn id(&self) -> &'static str {
        "dolphin"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            SourceInfo {
                id: self.id().into(),
                name: "Dolphin Compatibility List".into(),
                kind: SourceKind::Official,
                url: COMPAT_URL.into(),
                hardware_scope: None,
            },
            "gamecube",
            "dolphin",
            GAME_ID_TYPE,
            IdConvention::ProductCode { len: 6 },
        )
    }

    fn normalizer(&self) -> StatusNormalizer {
        StatusNormalizer::with_vocabulary(
            Vocabulary::new()
                .label("perfect", CompatStatus::Perfect)
                .label("playable", CompatStatus::Playable)
                .label("starts", CompatStatus::Ingame)
                .label("intro", CompatStatus::Intro)
                .label("broken", CompatStatus::Broken),
        )
    }

    fn resolver(&self) -> Box<dyn FieldResolver> {
        Box::new(DolphinResolver {
            inner: SynonymResolver::new(FieldSynonyms::standard(), GAME_ID_TYPE),
        })
    }
}

struct DolphinResolver {
    inner: SynonymResolver,
}

impl DolphinResolver {
    fn game_id(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner
            .resolve_identity(candidate)
            .map(|i| i.value)
            .or_else(|| candidate.text("_link").and_then(|l| game_id_from_link(&l)))
    }
}

impl FieldResolver for DolphinResolver {
    fn resolve_identity(&self, candidate: &CandidateRecord) -> Option<Identity> {
        self.game_id(candidate).map(|value| Identity {
            id_type: GAME_ID_TYPE.into(),
            value,
        })
    }

    fn resolve_title(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_title(candidate)
    }

    fn resolve_status(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner.resolve_status(candidate)
    }

    fn resolve_platform(&self, candidate: &CandidateRecord) -> Option<String> {
        self.inner
            .resolve_platform(candidate)
            .map(|p| p.to_lowercase())
            .or_else(|| self.game_id(candidate).map(|id| platform_for_game_id(&id).to_string()))
    }

    fn resolve_detail_url(&self, candidate: &CandidateRecord) -> Option<String> {
        candidate.text("_link").map(|l| absolute_url(BASE_URL, &l))
    }
}
