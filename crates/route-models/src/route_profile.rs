use serde::{Deserialize, Serialize};

use crate::route_point::RoutePoint;

/// Geometric classification of a route's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternTag {
    PointToPoint,
    OutAndBack,
    Loop,
    FigureEight,
    MultiLap,
    Unknown,
}

impl PatternTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternTag::PointToPoint => "point-to-point",
            PatternTag::OutAndBack => "out-and-back",
            PatternTag::Loop => "loop",
            PatternTag::FigureEight => "figure-eight",
            PatternTag::MultiLap => "multi-lap",
            PatternTag::Unknown => "unknown",
        }
    }
}

/// Whether a route's timestamps are trustworthy enough to derive duration from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampQuality {
    Valid,
    Invalid,
}

/// A single overlay annotation keyed by normalized route progress in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayHook {
    pub progress: f64,
    pub kind: String,
    pub label: String,
}

/// Immutable, analyzed description of a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteProfile {
    pub points: Vec<RoutePoint>,
    pub distance_m: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub duration_s: f64,
    pub timestamp_quality: TimestampQuality,
    pub pattern_tag: PatternTag,
    pub pattern_confidence: f64,
    pub overlay_hooks: Vec<OverlayHook>,
}

impl RouteProfile {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_s / 60.0
    }
}
