use route_models::RenderConfig;
use tokio::process::Command;

use crate::gpu::gpu_available;

const CPU_IMAGE: &str = "cesium-route-recorder";
const GPU_IMAGE: &str = "cesium-route-recorder:gpu";

/// Builds the `docker run` invocation for a single render job, following
/// the fixed invocation contract: read-only route-file bind mount,
/// read-write output bind mount, and a fixed set of environment variables.
pub struct ContainerCommand {
    runtime_binary: String,
    config: RenderConfig,
    container_route_path: String,
    use_gpu: bool,
}

impl ContainerCommand {
    pub fn new(runtime_binary: impl Into<String>, config: RenderConfig) -> Self {
        let container_route_path = format!("/app/dist/{}", config.route_filename);
        Self {
            runtime_binary: runtime_binary.into(),
            config,
            container_route_path,
            use_gpu: gpu_available(),
        }
    }

    pub fn force_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    fn image(&self) -> &'static str {
        if self.use_gpu {
            GPU_IMAGE
        } else {
            CPU_IMAGE
        }
    }

    /// Builds the fully assembled `tokio::process::Command`, ready to spawn
    /// with piped stdout/stderr.
    pub fn build(&self) -> Command {
        let mut command = Command::new(&self.runtime_binary);
        command.arg("run").arg("--rm");

        if self.use_gpu {
            command.arg("--gpus").arg("all");
        }

        command
            .arg("-v")
            .arg(format!(
                "{}:{}:ro",
                self.config.route_file_path.display(),
                self.container_route_path
            ))
            .arg("-v")
            .arg(format!("{}:/output:rw", self.config.output_dir.display()));

        for (key, value) in self.env_vars() {
            command.arg("-e").arg(format!("{key}={value}"));
        }

        command.arg(self.image());
        command
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("GPX_FILENAME".into(), self.config.route_filename.clone()),
            (
                "ANIMATION_SPEED".into(),
                self.config.animation_speed.to_string(),
            ),
            ("USER_NAME".into(), self.config.user_name.clone()),
            ("HEADLESS".into(), "1".into()),
            ("RECORD_FPS".into(), self.config.fps.to_string()),
            ("RECORD_WIDTH".into(), self.config.width.to_string()),
            ("RECORD_HEIGHT".into(), self.config.height.to_string()),
            (
                "RECORD_DURATION".into(),
                self.config.video_duration_s.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_models::{RationaleTag, SpeedPlan};
    use std::path::PathBuf;

    fn config() -> RenderConfig {
        RenderConfig::from_plan(
            PathBuf::from("/data/route.gpx"),
            "route.gpx".into(),
            PathBuf::from("/data/out"),
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
    fn selects_cpu_image_when_gpu_forced_off() {
        let command = ContainerCommand::new("docker", config()).force_gpu(false);
        assert_eq!(command.image(), CPU_IMAGE);
    }

    #[test]
    fn selects_gpu_image_when_gpu_forced_on() {
        let command = ContainerCommand::new("docker", config()).force_gpu(true);
        assert_eq!(command.image(), GPU_IMAGE);
    }

    #[test]
    fn env_vars_include_the_fixed_invocation_contract() {
        let command = ContainerCommand::new("docker", config());
        let vars = command.env_vars();
        let keys: Vec<&str> = vars.iter().map(|(k, _)| k.as_str()).collect();
        for expected in [
            "GPX_FILENAME",
            "ANIMATION_SPEED",
            "USER_NAME",
            "HEADLESS",
            "RECORD_FPS",
            "RECORD_WIDTH",
            "RECORD_HEIGHT",
            "RECORD_DURATION",
        ] {
            assert!(keys.contains(&expected), "missing {expected}");
        }
    }
}
