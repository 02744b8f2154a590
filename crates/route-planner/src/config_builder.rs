use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use route_models::settings::RecordingSettings;
use route_models::{RenderConfig, SpeedPlan};
use validator::Validate;

use crate::error::{PlannerError, PlannerResult};

/// `output_id` must be a filesystem-safe token: letters, digits, dash, underscore.
static OUTPUT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Request inputs supplied by the caller (the out-of-scope thin front layer).
pub struct RenderRequest {
    pub route_file_path: PathBuf,
    pub route_filename: String,
    pub output_dir: PathBuf,
    pub output_id: String,
    pub user_name: String,
}

#[derive(Validate)]
struct OutputIdField<'a> {
    #[validate(regex(path = "*OUTPUT_ID_RE"), length(min = 1))]
    output_id: &'a str,
}

/// Merges a route request, speed plan, and recording defaults into a
/// complete, immutable [`RenderConfig`].
pub fn build_config(
    request: RenderRequest,
    plan: SpeedPlan,
    recording: &RecordingSettings,
) -> PlannerResult<RenderConfig> {
    validate_absolute(&request.route_file_path)
        .map_err(|p| PlannerError::PathNotAbsolute(p.display().to_string()))?;
    validate_absolute(&request.output_dir)
        .map_err(|p| PlannerError::OutputDirNotAbsolute(p.display().to_string()))?;

    OutputIdField {
        output_id: &request.output_id,
    }
    .validate()
    .map_err(|_| PlannerError::InvalidOutputId(request.output_id.clone()))?;

    Ok(RenderConfig::from_plan(
        request.route_file_path,
        request.route_filename,
        request.output_dir,
        request.output_id,
        request.user_name,
        recording.fps,
        recording.width,
        recording.height,
        plan,
    ))
}

fn validate_absolute(path: &Path) -> Result<(), PathBuf> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_models::RationaleTag;

    fn plan() -> SpeedPlan {
        SpeedPlan {
            multiplier: 7,
            video_duration_s: 534,
            rationale_tag: RationaleTag::Adaptive,
        }
    }

    #[test]
    fn rejects_relative_route_path() {
        let request = RenderRequest {
            route_file_path: PathBuf::from("route.gpx"),
            route_filename: "route.gpx".into(),
            output_dir: PathBuf::from("/tmp/out"),
            output_id: "abc123".into(),
            user_name: "alice".into(),
        };
        let err = build_config(request, plan(), &RecordingSettings::default()).unwrap_err();
        assert!(matches!(err, PlannerError::PathNotAbsolute(_)));
    }

    #[test]
    fn rejects_invalid_output_id() {
        let request = RenderRequest {
            route_file_path: PathBuf::from("/tmp/route.gpx"),
            route_filename: "route.gpx".into(),
            output_dir: PathBuf::from("/tmp/out"),
            output_id: "not valid!".into(),
            user_name: "alice".into(),
        };
        let err = build_config(request, plan(), &RecordingSettings::default()).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidOutputId(_)));
    }

    #[test]
    fn builds_config_from_valid_inputs() {
        let request = RenderRequest {
            route_file_path: PathBuf::from("/tmp/route.gpx"),
            route_filename: "route.gpx".into(),
            output_dir: PathBuf::from("/tmp/out"),
            output_id: "abc-123_XYZ".into(),
            user_name: "alice".into(),
        };
        let config = build_config(request, plan(), &RecordingSettings::default()).unwrap();
        assert_eq!(config.animation_speed, 7);
        assert_eq!(config.fps, 30);
    }
}
