use serde::{Deserialize, Serialize};

/// Speed Planner tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub default_speed: u32,
    pub min_speed: u32,
    pub max_speed: u32,
    pub max_video_minutes: f64,
    pub adaptive_enabled: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            default_speed: 2,
            min_speed: 1,
            max_speed: 100,
            max_video_minutes: 10.0,
            adaptive_enabled: true,
        }
    }
}

/// Recording geometry defaults for the render container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 720,
            height: 1280,
        }
    }
}

/// Memory monitor thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub check_interval_ms: u64,
    pub warning_threshold_mb: f64,
    pub critical_threshold_mb: f64,
    pub sample_capacity: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            check_interval_ms: 30_000,
            warning_threshold_mb: 1500.0,
            critical_threshold_mb: 2000.0,
            sample_capacity: 120,
        }
    }
}

/// Pipeline Coordinator tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub max_concurrent: usize,
    pub job_timeout_ms: u64,
    pub progress_map_lo: u8,
    pub progress_map_hi: u8,
    pub buffer_seconds: u64,
    pub history_cap: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            job_timeout_ms: 60 * 60 * 1000,
            progress_map_lo: 35,
            progress_map_hi: 85,
            buffer_seconds: 19,
            history_cap: 100,
        }
    }
}

/// Top-level settings record loaded once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub animation: AnimationSettings,
    pub recording: RecordingSettings,
    pub memory: MemorySettings,
    pub orchestrator: OrchestratorSettings,
}
