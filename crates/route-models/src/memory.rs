use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single host-memory observation for a running job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub timestamp: DateTime<Utc>,
    pub rss_mb: f64,
    pub heap_used_mb: f64,
    pub heap_total_mb: f64,
    pub external_mb: f64,
}

/// Directional trend computed from a monitor's rolling sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Aggregated statistics over the lifetime of a memory monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub peak_rss_mb: f64,
    pub average_rss_mb: f64,
    pub warning_events: u32,
    pub critical_events: u32,
    pub trend: MemoryTrend,
}
