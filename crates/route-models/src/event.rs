use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::render_job::{Completion, JobStage};

/// A single lifecycle event fired for a job, in the order the coordinator
/// guarantees: stage changes and progress in stage order, then exactly one
/// terminal `Error` or `Complete` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    StageChanged {
        output_id: String,
        stage: JobStage,
        progress_percent: u8,
        message: String,
    },
    Progress {
        output_id: String,
        progress_percent: u8,
        message: String,
    },
    MemoryWarning {
        output_id: String,
        rss_mb: f64,
        critical: bool,
    },
    Error {
        output_id: String,
        payload: ErrorPayload,
    },
    Complete {
        output_id: String,
        completion: Completion,
    },
}
