use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::speed_plan::SpeedPlan;

/// Complete, immutable instructions for a single render invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub route_file_path: PathBuf,
    pub route_filename: String,
    pub output_dir: PathBuf,
    pub output_id: String,
    pub user_name: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub animation_speed: u32,
    pub video_duration_s: u64,
}

impl RenderConfig {
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join("route-video.mp4")
    }

    pub fn overlay_data_path(&self) -> PathBuf {
        self.output_dir.join("overlay-data.json")
    }

    pub fn recorder_log_path(&self) -> PathBuf {
        self.output_dir.join("recorder.log")
    }

    pub fn recorder_error_log_path(&self) -> PathBuf {
        self.output_dir.join("recorder-error.log")
    }

    pub fn from_plan(
        route_file_path: PathBuf,
        route_filename: String,
        output_dir: PathBuf,
        output_id: String,
        user_name: String,
        fps: u32,
        width: u32,
        height: u32,
        plan: SpeedPlan,
    ) -> Self {
        Self {
            route_file_path,
            route_filename,
            output_dir,
            output_id,
            user_name,
            fps,
            width,
            height,
            animation_speed: plan.multiplier,
            video_duration_s: plan.video_duration_s,
        }
    }
}
