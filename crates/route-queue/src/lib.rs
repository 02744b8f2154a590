#![deny(unreachable_patterns)]

//! Admission queue: a process-local, priority-ordered FIFO that enforces
//! the global render concurrency cap (by default 1, reflecting a single
//! shared GPU).

mod ticket;

use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

pub use ticket::Ticket;

/// Fallback estimated wait used when no empirical mean render time is
/// available yet.
const DEFAULT_MEAN_RENDER_TIME: Duration = Duration::from_secs(600);

struct QueueState {
    waiting: BinaryHeap<Ticket>,
    running: HashSet<String>,
}

/// A point-in-time view of queue occupancy.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub queued: Vec<String>,
    pub running: Vec<String>,
}

/// Process-local admission queue. All state lives behind a single mutex;
/// every operation is a short critical section, never held across an await
/// that waits on anything other than the lock itself.
pub struct AdmissionQueue {
    max_concurrent: usize,
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            state: Mutex::new(QueueState {
                waiting: BinaryHeap::new(),
                running: HashSet::new(),
            }),
        }
    }

    /// Adds a job to the queue. Default priority is `0`; negative
    /// priorities are accepted and simply sort behind zero and positive
    /// values.
    pub async fn enqueue(&self, output_id: impl Into<String>, priority: i32) {
        let mut state = self.state.lock().await;
        state.waiting.push(Ticket {
            output_id: output_id.into(),
            priority,
            enqueued_at: Utc::now(),
        });
    }

    /// Pops and admits the next eligible job if a concurrency slot is free.
    /// Call this after enqueue and after every `release`.
    pub async fn try_dispatch(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        if state.running.len() >= self.max_concurrent {
            return None;
        }
        let ticket = state.waiting.pop()?;
        state.running.insert(ticket.output_id.clone());
        Some(ticket.output_id)
    }

    /// Releases a running job's slot, making room for the next dispatch.
    pub async fn release(&self, output_id: &str) {
        let mut state = self.state.lock().await;
        state.running.remove(output_id);
    }

    /// Removes a job from the waiting line before it was ever dispatched.
    /// Returns `false` if it was not found there (already running, or
    /// unknown).
    pub async fn cancel_waiting(&self, output_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.waiting.len();
        state.waiting = state
            .waiting
            .drain()
            .filter(|t| t.output_id != output_id)
            .collect();
        state.waiting.len() != before
    }

    pub async fn is_running(&self, output_id: &str) -> bool {
        self.state.lock().await.running.contains(output_id)
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            queued: state.waiting.iter().map(|t| t.output_id.clone()).collect(),
            running: state.running.iter().cloned().collect(),
        }
    }

    /// Jobs ahead of `output_id` in the waiting line (by dispatch order),
    /// or `None` if it isn't currently waiting.
    pub async fn jobs_ahead(&self, output_id: &str) -> Option<usize> {
        let state = self.state.lock().await;
        let mut ordered: Vec<&Ticket> = state.waiting.iter().collect();
        ordered.sort_by(|a, b| b.cmp(a));
        ordered.iter().position(|t| t.output_id == output_id)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

/// Estimated wait for a job `jobs_ahead` positions back in the line, given
/// an (optional) empirical mean render time. Falls back to a fixed
/// 600-second assumption when no mean is known yet.
pub fn estimated_wait(jobs_ahead: usize, max_concurrent: usize, mean_render_time: Option<Duration>) -> Duration {
    let mean = mean_render_time.unwrap_or(DEFAULT_MEAN_RENDER_TIME).as_secs_f64();
    let max_concurrent = max_concurrent.max(1) as f64;
    let seconds = (jobs_ahead as f64 / max_concurrent * mean).ceil();
    Duration::from_secs(seconds as u64)
}
