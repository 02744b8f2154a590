use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use route_models::{MemorySample, MemorySnapshot, MemoryTrend};
use tokio::sync::{mpsc, watch};
use tokio::time;

/// Tunables for a single job's memory monitor.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMonitorConfig {
    pub interval: Duration,
    pub warning_threshold_mb: f64,
    pub critical_threshold_mb: f64,
    pub sample_capacity: usize,
}

/// A threshold crossing observed by the monitor. Non-fatal by itself; the
/// coordinator decides whether to escalate.
#[derive(Debug, Clone, Copy)]
pub enum MemoryEvent {
    Warning { rss_mb: f64 },
    Critical { rss_mb: f64 },
}

/// Samples a process's resident memory on a fixed interval for the
/// lifetime of a render job, tracking peak usage, threshold crossings, and
/// a short-window trend.
pub struct MemoryMonitor {
    pid: u32,
    config: MemoryMonitorConfig,
    samples: VecDeque<MemorySample>,
    peak_rss_mb: f64,
    warning_events: u32,
    critical_events: u32,
}

impl MemoryMonitor {
    pub fn new(pid: u32, config: MemoryMonitorConfig) -> Self {
        Self {
            pid,
            config,
            samples: VecDeque::new(),
            peak_rss_mb: 0.0,
            warning_events: 0,
            critical_events: 0,
        }
    }

    /// Samples until `stop_rx` flips true, emitting threshold-crossing
    /// events over `event_tx`, then returns the final summary.
    pub async fn run(
        mut self,
        mut stop_rx: watch::Receiver<bool>,
        event_tx: mpsc::UnboundedSender<MemoryEvent>,
    ) -> MemorySnapshot {
        let mut interval = time::interval(self.config.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(rss_mb) = read_rss_mb(self.pid) {
                        self.record(rss_mb, &event_tx);
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        self.snapshot()
    }

    fn record(&mut self, rss_mb: f64, event_tx: &mpsc::UnboundedSender<MemoryEvent>) {
        let sample = MemorySample {
            timestamp: Utc::now(),
            rss_mb,
            heap_used_mb: rss_mb,
            heap_total_mb: rss_mb,
            external_mb: 0.0,
        };
        if self.samples.len() >= self.config.sample_capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.peak_rss_mb = self.peak_rss_mb.max(rss_mb);

        if rss_mb >= self.config.critical_threshold_mb {
            self.critical_events += 1;
            let _ = event_tx.send(MemoryEvent::Critical { rss_mb });
        } else if rss_mb >= self.config.warning_threshold_mb {
            self.warning_events += 1;
            let _ = event_tx.send(MemoryEvent::Warning { rss_mb });
        }
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let average_rss_mb = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().map(|s| s.rss_mb).sum::<f64>() / self.samples.len() as f64
        };
        MemorySnapshot {
            peak_rss_mb: self.peak_rss_mb,
            average_rss_mb,
            warning_events: self.warning_events,
            critical_events: self.critical_events,
            trend: self.trend(),
        }
    }

    /// Compares the mean of the last 10 samples against the mean of the
    /// previous 10; a swing beyond +/-10% is reported as a trend.
    fn trend(&self) -> MemoryTrend {
        if self.samples.len() < 20 {
            return MemoryTrend::Stable;
        }
        let recent: f64 =
            self.samples.iter().rev().take(10).map(|s| s.rss_mb).sum::<f64>() / 10.0;
        let previous: f64 = self
            .samples
            .iter()
            .rev()
            .skip(10)
            .take(10)
            .map(|s| s.rss_mb)
            .sum::<f64>()
            / 10.0;
        if previous <= 0.0 {
            return MemoryTrend::Stable;
        }
        let change = (recent - previous) / previous;
        if change > 0.10 {
            MemoryTrend::Increasing
        } else if change < -0.10 {
            MemoryTrend::Decreasing
        } else {
            MemoryTrend::Stable
        }
    }
}

/// Reads resident set size for a process from `/proc/<pid>/status` (Linux).
fn read_rss_mb(pid: u32) -> Option<f64> {
    let contents = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: f64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kb / 1024.0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MemoryMonitorConfig {
        MemoryMonitorConfig {
            interval: Duration::from_millis(10),
            warning_threshold_mb: 100.0,
            critical_threshold_mb: 200.0,
            sample_capacity: 5,
        }
    }

    #[tokio::test]
    async fn records_warning_and_critical_crossings() {
        let mut monitor = MemoryMonitor::new(std::process::id(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();

        monitor.record(50.0, &tx);
        monitor.record(150.0, &tx);
        monitor.record(250.0, &tx);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.warning_events, 1);
        assert_eq!(snapshot.critical_events, 1);
        assert_eq!(snapshot.peak_rss_mb, 250.0);

        assert!(matches!(rx.try_recv(), Ok(MemoryEvent::Warning { .. })));
        assert!(matches!(rx.try_recv(), Ok(MemoryEvent::Critical { .. })));
    }

    #[tokio::test]
    async fn sample_ring_is_bounded_by_capacity() {
        let mut monitor = MemoryMonitor::new(std::process::id(), config());
        let (tx, _rx) = mpsc::unbounded_channel();
        for i in 0..10 {
            monitor.record(i as f64, &tx);
        }
        assert_eq!(monitor.samples.len(), 5);
    }

    #[test]
    fn trend_is_stable_with_too_few_samples() {
        let monitor = MemoryMonitor::new(std::process::id(), config());
        assert!(matches!(monitor.trend(), MemoryTrend::Stable));
    }
}
