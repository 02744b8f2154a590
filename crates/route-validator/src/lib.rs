#![deny(unreachable_patterns)]

//! Output Validator: confirms the expected render artifact actually landed
//! on disk before a job is allowed to report success.

pub mod error;

use chrono::{DateTime, Utc};
use route_models::RenderConfig;

pub use error::{ValidationError, ValidationReason, ValidatorResult};

/// Stat data for a validated output artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOutput {
    pub video_path: String,
    pub size_bytes: u64,
    pub mtime: DateTime<Utc>,
}

/// Checks that `<output_dir>/route-video.mp4` exists, is non-empty, and was
/// written after the job started (guarding against a stale artifact left
/// over from a previous run under the same `output_id`).
pub fn validate_output(config: &RenderConfig, job_started_at: DateTime<Utc>) -> ValidatorResult<ValidatedOutput> {
    let video_path = config.video_path();

    let metadata = std::fs::metadata(&video_path).map_err(|_| {
        ValidationError::new(
            ValidationReason::Missing,
            format!("{} does not exist", video_path.display()),
        )
    })?;

    let mtime: DateTime<Utc> = metadata
        .modified()
        .map_err(|e| ValidationError::new(ValidationReason::Unreadable, e.to_string()))?
        .into();

    if mtime < job_started_at {
        return Err(ValidationError::new(
            ValidationReason::Missing,
            "existing file predates this job and was not refreshed",
        ));
    }

    if metadata.len() == 0 {
        return Err(ValidationError::new(
            ValidationReason::Empty,
            format!("{} is empty", video_path.display()),
        ));
    }

    Ok(ValidatedOutput {
        video_path: video_path.display().to_string(),
        size_bytes: metadata.len(),
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_models::{RationaleTag, SpeedPlan};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> RenderConfig {
        RenderConfig::from_plan(
            PathBuf::from("/dev/null"),
            "route.gpx".into(),
            dir.path().to_path_buf(),
            "abc123".into(),
            "alice".into(),
            30,
            720,
            1280,
            SpeedPlan {
                multiplier: 1,
                video_duration_s: 30,
                rationale_tag: RationaleTag::Fixed,
            },
        )
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let err = validate_output(&config, Utc::now()).unwrap_err();
        assert_eq!(err.reason, ValidationReason::Missing);
    }

    #[test]
    fn empty_file_is_reported_as_empty() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let started_at = Utc::now() - chrono::Duration::seconds(5);
        std::fs::write(config.video_path(), []).unwrap();

        let err = validate_output(&config, started_at).unwrap_err();
        assert_eq!(err.reason, ValidationReason::Empty);
    }

    #[test]
    fn nonempty_fresh_file_validates_successfully() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let started_at = Utc::now() - chrono::Duration::seconds(5);
        std::fs::write(config.video_path(), b"not really mp4 bytes").unwrap();

        let output = validate_output(&config, started_at).unwrap();
        assert_eq!(output.size_bytes, 21);
    }

    #[test]
    fn stale_file_older_than_job_start_is_treated_as_missing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(config.video_path(), b"leftover from a prior run").unwrap();
        let started_at = Utc::now() + chrono::Duration::seconds(60);

        let err = validate_output(&config, started_at).unwrap_err();
        assert_eq!(err.reason, ValidationReason::Missing);
    }
}
