use serde::{Deserialize, Serialize};

/// Emulator compatibility buckets, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatStatus {
    Perfect,
    Playable,
    Ingame,
    Intro,
    Boot,
    Broken,
    Unknown,
}

impl CompatStatus {
    pub const ALL: [CompatStatus; 7] = [
        CompatStatus::Perfect,
        CompatStatus::Playable,
        CompatStatus::Ingame,
        CompatStatus::Intro,
        CompatStatus::Boot,
        CompatStatus::Broken,
        CompatStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompatStatus::Perfect => "perfect",
            CompatStatus::Playable => "playable",
            CompatStatus::Ingame => "ingame",
            CompatStatus::Intro => "intro",
            CompatStatus::Boot => "boot",
            CompatStatus::Broken => "broken",
            CompatStatus::Unknown => "unknown",
        }
    }

    pub fn default_tier(&self) -> PerformanceTier {
        match self {
            CompatStatus::Perfect => PerformanceTier::Excellent,
            CompatStatus::Playable => PerformanceTier::Playable,
            CompatStatus::Ingame => PerformanceTier::Poor,
            CompatStatus::Intro | CompatStatus::Boot | CompatStatus::Broken => PerformanceTier::Unplayable,
            CompatStatus::Unknown => PerformanceTier::Unknown,
        }
    }
}

/// Coarser device-performance scale used by community reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Playable,
    Poor,
    Unplayable,
    Unknown,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::Playable => "playable",
            PerformanceTier::Poor => "poor",
            PerformanceTier::Unplayable => "unplayable",
            PerformanceTier::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    pub status: CompatStatus,
    pub tier: PerformanceTier,
}

impl Normalized {
    pub const UNKNOWN: Normalized = Normalized {
        status: CompatStatus::Unknown,
        tier: PerformanceTier::Unknown,
    };

    pub fn new(status: CompatStatus, tier: PerformanceTier) -> Self {
        Self { status, tier }
    }
}

impl From<CompatStatus> for Normalized {
    fn from(status: CompatStatus) -> Self {
        Self {
            status,
            tier: status.default_tier(),
        }
    }
}
