use std::path::Path;

/// Default device node checked for GPU availability. Overridable for tests.
const DEFAULT_GPU_DEVICE_NODE: &str = "/dev/dri/renderD128";

/// Probes whether GPU acceleration is usable on this host: the `USE_GPU`
/// environment variable opts in explicitly, or a render device node exists.
///
/// Mirrors the `which::which("ffmpeg")`-style "ask the OS, don't guess"
/// probing idiom used for external binaries elsewhere in this stack.
pub fn gpu_available() -> bool {
    if let Ok(flag) = std::env::var("USE_GPU") {
        if flag == "0" || flag.eq_ignore_ascii_case("false") {
            return false;
        }
        if flag == "1" || flag.eq_ignore_ascii_case("true") {
            return true;
        }
    }
    Path::new(DEFAULT_GPU_DEVICE_NODE).exists()
}

/// Confirms the container runtime binary (e.g. `docker`) is on `PATH`.
pub fn check_container_runtime(binary: &str) -> bool {
    which::which(binary).is_ok()
}
