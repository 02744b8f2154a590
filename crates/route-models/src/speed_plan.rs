use serde::{Deserialize, Serialize};

/// Why a particular animation multiplier was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RationaleTag {
    Fixed,
    Adaptive,
    CappedExceeds,
}

/// Resolved animation speed and expected output duration for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedPlan {
    pub multiplier: u32,
    pub video_duration_s: u64,
    pub rationale_tag: RationaleTag,
}
