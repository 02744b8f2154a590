use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use route_models::RenderConfig;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::time::Sleep;

use crate::error::{ExecutorError, ExecutorResult};
use crate::progress::{parse_progress_line, FrameProgress};

/// Cap on the in-memory stdout/stderr tail buffers kept for error reporting;
/// older bytes are dropped from the front once this is exceeded.
const BUFFER_CAP_BYTES: usize = 64 * 1024;

/// Outcome of a single container run.
pub struct ExecResult {
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

/// Runs a single render container: streams stdout/stderr to both bounded
/// in-memory buffers and the job's log files, scans stdout for frame
/// progress markers, and supports cooperative cancellation plus a hard
/// wall-clock timeout.
pub struct ContainerRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

impl Default for ContainerRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout: None,
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Spawns `command`, streams its output, and resolves once the child
    /// exits (or is canceled/timed out). `on_progress` is invoked on the
    /// task that reads stdout, once per `Frame <n>/<N>` marker seen.
    pub async fn run_with_progress<F, S>(
        &self,
        mut command: Command,
        config: &RenderConfig,
        mut on_progress: F,
        on_spawn: S,
    ) -> ExecutorResult<ExecResult>
    where
        F: FnMut(FrameProgress) + Send + 'static,
        S: FnOnce(u32),
    {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = command.spawn()?;
        if let Some(pid) = child.id() {
            on_spawn(pid);
        }

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let mut stdout_log_options = OpenOptions::new();
        stdout_log_options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // World-writable: the render container, running as its own
            // user inside the sandbox, must also be able to append here.
            stdout_log_options.mode(0o666);
        }
        let mut stdout_log = stdout_log_options.open(config.recorder_log_path()).await?;
        let stdout_tail = Arc::new(Mutex::new(String::new()));
        let stdout_tail_writer = stdout_tail.clone();

        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stdout_log.write_all(line.as_bytes()).await;
                let _ = stdout_log.write_all(b"\n").await;
                append_bounded(&stdout_tail_writer, &line).await;
                if let Some(progress) = parse_progress_line(&line) {
                    on_progress(progress);
                }
            }
        });

        // Opened lazily: only created once something is actually written,
        // matching "present when errors occurred" from the filesystem contract.
        let stderr_log_path = config.recorder_error_log_path();
        let stderr_tail = Arc::new(Mutex::new(String::new()));
        let stderr_tail_writer = stderr_tail.clone();

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut log: Option<tokio::fs::File> = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if log.is_none() {
                    let mut stderr_log_options = OpenOptions::new();
                    stderr_log_options.create(true).append(true);
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::OpenOptionsExt;
                        stderr_log_options.mode(0o666);
                    }
                    log = stderr_log_options.open(&stderr_log_path).await.ok();
                }
                if let Some(file) = log.as_mut() {
                    let _ = file.write_all(line.as_bytes()).await;
                    let _ = file.write_all(b"\n").await;
                }
                append_bounded(&stderr_tail_writer, &line).await;
            }
        });

        let wait_result = self.wait_for_completion(&mut child).await;

        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let status = wait_result?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let stdout_tail_value = stdout_tail.lock().await.clone();
        let stderr_tail_value = stderr_tail.lock().await.clone();

        Ok(ExecResult {
            exit_code: status.code().unwrap_or(-1),
            duration_ms,
            stdout_tail: stdout_tail_value,
            stderr_tail: stderr_tail_value,
        })
    }

    async fn wait_for_completion(&self, child: &mut Child) -> ExecutorResult<ExitStatus> {
        let mut cancel_rx = self.cancel_rx.clone();
        let mut deadline = self.timeout.map(|d| Box::pin(tokio::time::sleep(d)));

        tokio::select! {
            status = child.wait() => Ok(status?),
            _ = cancel_signal(&mut cancel_rx) => {
                let _ = child.start_kill();
                Err(ExecutorError::Canceled)
            }
            _ = timeout_signal(&mut deadline) => {
                let _ = child.start_kill();
                Err(ExecutorError::Timeout)
            }
        }
    }
}

async fn cancel_signal(rx: &mut Option<watch::Receiver<bool>>) {
    match rx {
        Some(rx) => {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            std::future::pending::<()>().await
        }
        None => std::future::pending::<()>().await,
    }
}

async fn timeout_signal(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(s) => s.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

async fn append_bounded(buffer: &Arc<Mutex<String>>, line: &str) {
    let mut buf = buffer.lock().await;
    buf.push_str(line);
    buf.push('\n');
    if buf.len() > BUFFER_CAP_BYTES {
        let excess = buf.len() - BUFFER_CAP_BYTES;
        buf.drain(0..excess);
    }
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

    #[tokio::test]
    async fn streams_output_and_parses_progress_markers() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut command = Command::new("sh");
        command.arg("-c").arg(
            "echo 'Cesium viewer ready'; echo 'Frame 1/2'; echo 'Frame 2/2'; exit 0",
        );

        let progress_events = Arc::new(Mutex::new(Vec::new()));
        let progress_events_cb = progress_events.clone();

        let runner = ContainerRunner::new();
        let result = runner
            .run_with_progress(
                command,
                &config,
                move |progress| {
                    let events = progress_events_cb.clone();
                    tokio::spawn(async move {
                        events.lock().await.push(progress);
                    });
                },
                |_pid| {},
            )
            .await
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(result.stdout_tail.contains("Cesium viewer ready"));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child_and_reports_canceled() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 5");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let runner = ContainerRunner::new().with_cancel(cancel_rx);

        let run_fut = runner.run_with_progress(command, &config, |_| {}, |_pid| {});
        tokio::pin!(run_fut);

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_tx.send(true).unwrap();

        let result = run_fut.await;
        assert!(matches!(result, Err(ExecutorError::Canceled)));
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_timeout() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 5");

        let runner = ContainerRunner::new().with_timeout(Duration::from_millis(50));
        let result = runner
            .run_with_progress(command, &config, |_| {}, |_pid| {})
            .await;
        assert!(matches!(result, Err(ExecutorError::Timeout)));
    }
}
