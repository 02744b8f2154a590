use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::memory::MemorySnapshot;
use crate::render_config::RenderConfig;

/// Stage of the render pipeline's state machine.
///
/// Ordering is significant: a job's stage only ever advances forward
/// through this sequence, or jumps to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    Analyze,
    Prepare,
    Render,
    Validate,
    Complete,
    Failed,
    Canceled,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Complete | JobStage::Failed | JobStage::Canceled)
    }

    /// The `[lo, hi]` overall-progress window reserved for this stage.
    pub fn progress_window(&self) -> (u8, u8) {
        match self {
            JobStage::Queued => (0, 0),
            JobStage::Analyze => (10, 20),
            JobStage::Prepare => (20, 30),
            JobStage::Render => (30, 90),
            JobStage::Validate => (90, 95),
            JobStage::Complete => (95, 100),
            JobStage::Failed | JobStage::Canceled => (0, 100),
        }
    }
}

/// Final outcome of a render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    Pending,
    Success {
        video_url: String,
        file_size: u64,
        animation_speed: u32,
        video_duration_s: u64,
        route_duration_minutes: f64,
        video_width: u32,
        video_height: u32,
        analysis_ms: u64,
        render_ms: u64,
        memory_summary: Option<MemorySnapshot>,
        logs_url: String,
    },
    Failure {
        payload: ErrorPayload,
    },
}

/// Inputs gathered across the pipeline needed to assemble a [`Completion::Success`].
pub struct CompletionFacts {
    pub video_url: String,
    pub file_size: u64,
    pub animation_speed: u32,
    pub video_duration_s: u64,
    pub route_duration_minutes: f64,
    pub video_width: u32,
    pub video_height: u32,
    pub analysis_ms: u64,
    pub render_ms: u64,
    pub memory_summary: Option<MemorySnapshot>,
    pub logs_url: String,
}

/// Opaque handle returned from job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub output_id: String,
}

/// Full mutable record of a single render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub config: RenderConfig,
    pub stage: JobStage,
    pub progress_percent: u8,
    pub current_message: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancel_requested: bool,
    pub memory_summary: Option<MemorySnapshot>,
    pub completion: Completion,
}

impl RenderJob {
    pub fn new(config: RenderConfig) -> Self {
        let now = Utc::now();
        Self {
            config,
            stage: JobStage::Queued,
            progress_percent: 0,
            current_message: String::from("queued"),
            started_at: now,
            updated_at: now,
            cancel_requested: false,
            memory_summary: None,
            completion: Completion::Pending,
        }
    }

    pub fn output_id(&self) -> &str {
        &self.config.output_id
    }

    /// Advance to the next stage, clamping progress into the new stage's window.
    pub fn advance(&mut self, stage: JobStage, message: impl Into<String>) {
        let (lo, _) = stage.progress_window();
        self.stage = stage;
        self.progress_percent = self.progress_percent.max(lo);
        self.current_message = message.into();
        self.updated_at = Utc::now();
    }

    /// Set progress within the current stage's window, never decreasing.
    pub fn set_progress(&mut self, percent: u8, message: impl Into<String>) {
        let (lo, hi) = self.stage.progress_window();
        let clamped = percent.clamp(lo, hi);
        self.progress_percent = self.progress_percent.max(clamped);
        self.current_message = message.into();
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, payload: ErrorPayload) {
        self.stage = JobStage::Failed;
        self.completion = Completion::Failure { payload };
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        self.cancel_with_payload(ErrorPayload::new(crate::error::ErrorKind::Canceled, "canceled"));
    }

    /// Terminates the job into the `Canceled` stage with a caller-supplied
    /// payload. Used both for cooperative cancellation and for a wall-clock
    /// timeout escalating into a cancel (`kind=timeout`).
    pub fn cancel_with_payload(&mut self, payload: ErrorPayload) {
        self.stage = JobStage::Canceled;
        self.cancel_requested = true;
        self.completion = Completion::Failure { payload };
        self.updated_at = Utc::now();
    }

    pub fn succeed(&mut self, facts: CompletionFacts) {
        self.stage = JobStage::Complete;
        self.progress_percent = 100;
        self.memory_summary = facts.memory_summary;
        self.completion = Completion::Success {
            video_url: facts.video_url,
            file_size: facts.file_size,
            animation_speed: facts.animation_speed,
            video_duration_s: facts.video_duration_s,
            route_duration_minutes: facts.route_duration_minutes,
            video_width: facts.video_width,
            video_height: facts.video_height,
            analysis_ms: facts.analysis_ms,
            render_ms: facts.render_ms,
            memory_summary: self.memory_summary,
            logs_url: facts.logs_url,
        };
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed_plan::{RationaleTag, SpeedPlan};
    use std::path::PathBuf;

    fn sample_config() -> RenderConfig {
        RenderConfig::from_plan(
            PathBuf::from("/tmp/route.gpx"),
            "route.gpx".into(),
            PathBuf::from("/tmp/out"),
            "abc123".into(),
            "alice".into(),
            30,
            720,
            1280,
            SpeedPlan {
                multiplier: 7,
                video_duration_s: 534,
                rationale_tag: RationaleTag::Adaptive,
            },
        )
    }

    #[test]
    fn new_job_starts_queued() {
        let job = RenderJob::new(sample_config());
        assert_eq!(job.stage, JobStage::Queued);
        assert_eq!(job.progress_percent, 0);
    }

    #[test]
    fn advance_clamps_progress_into_window() {
        let mut job = RenderJob::new(sample_config());
        job.advance(JobStage::Analyze, "analyzing");
        assert_eq!(job.stage, JobStage::Analyze);
        assert_eq!(job.progress_percent, 10);

        job.set_progress(5, "should not regress");
        assert_eq!(job.progress_percent, 10);

        job.set_progress(18, "partway");
        assert_eq!(job.progress_percent, 18);
    }

    #[test]
    fn succeed_sets_completion() {
        let mut job = RenderJob::new(sample_config());
        job.succeed(CompletionFacts {
            video_url: "/output/abc123/route-video.mp4".into(),
            file_size: 1024,
            animation_speed: 7,
            video_duration_s: 534,
            route_duration_minutes: 60.0,
            video_width: 720,
            video_height: 1280,
            analysis_ms: 50,
            render_ms: 5000,
            memory_summary: None,
            logs_url: "/output/abc123/recorder.log".into(),
        });
        assert_eq!(job.stage, JobStage::Complete);
        assert_eq!(job.progress_percent, 100);
        assert!(matches!(job.completion, Completion::Success { .. }));
    }
}
