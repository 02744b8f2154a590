//! RAII cleanup for a dispatched job's admission-queue slot.
//!
//! Every code path through [`crate::coordinator::PipelineCoordinator`]'s
//! job execution task must release the slot it occupied, on success,
//! failure, cancellation, or panic. Calling `release` is async (it takes
//! a lock), so it cannot happen in `Drop` itself; `finish()` is the
//! normal path and `Drop` only logs if a bug skipped it.

use route_queue::AdmissionQueue;
use std::sync::Arc;

pub struct JobGuard {
    queue: Arc<AdmissionQueue>,
    output_id: String,
    finished: bool,
}

impl JobGuard {
    pub fn new(queue: Arc<AdmissionQueue>, output_id: impl Into<String>) -> Self {
        Self {
            queue,
            output_id: output_id.into(),
            finished: false,
        }
    }

    /// Release the admission-queue slot. Always call this on every exit
    /// path of the job's execution task, including error paths.
    pub async fn finish(mut self) {
        self.queue.release(&self.output_id).await;
        self.finished = true;
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                output_id = %self.output_id,
                "JobGuard dropped without finish() - admission queue slot may be leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finish_releases_the_slot() {
        let queue = Arc::new(AdmissionQueue::new(1));
        queue.enqueue("job-1", 0).await;
        assert_eq!(queue.try_dispatch().await, Some("job-1".to_string()));
        assert!(queue.is_running("job-1").await);

        let guard = JobGuard::new(queue.clone(), "job-1");
        guard.finish().await;

        assert!(!queue.is_running("job-1").await);
    }
}
