//! Pipeline Coordinator: the orchestrator's state machine.
//!
//! Wires the Route Analyzer, Speed Planner, Config Builder, Container
//! Executor, and Output Validator into a single
//! ANALYZE -> PREPARE -> RENDER -> VALIDATE -> COMPLETE sequence per job,
//! admitted through the concurrency-capped queue. One [`PipelineCoordinator`]
//! is shared process-wide; jobs run independently of each other but each
//! job's own stages run strictly in order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use route_executor::{ContainerCommand, ContainerRunner, MemoryEvent, MemoryMonitor, MemoryMonitorConfig};
use route_models::{
    Completion, CompletionFacts, ErrorKind, ErrorPayload, JobEvent, JobHandle, JobStage,
    RationaleTag, RenderConfig, RenderJob, RouteProfile, Settings, SpeedPlan,
};
use route_planner::RenderRequest;
use route_queue::AdmissionQueue;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::job_guard::JobGuard;
use crate::logging::JobLogger;

pub type EventCallback = Arc<dyn Fn(JobEvent) + Send + Sync>;

/// Point-in-time status returned by `getRenderStatus`.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub output_id: String,
    pub stage: JobStage,
    pub progress_percent: u8,
    pub elapsed_ms: u64,
    pub logs_url: String,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub running: usize,
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
    pub queued_jobs: Vec<String>,
    pub running_jobs: Vec<String>,
}

#[derive(Serialize)]
struct OverlayData<'a> {
    distance_m: f64,
    elevation_gain_m: f64,
    elevation_loss_m: f64,
    duration_s: f64,
    pattern_tag: &'a str,
    pattern_confidence: f64,
    overlay_hooks: &'a [route_models::OverlayHook],
    animation_speed: u32,
    video_duration_s: u64,
    generated_at: chrono::DateTime<Utc>,
}

struct JobContext {
    cancel_tx: watch::Sender<bool>,
}

/// Result of a single container run: the memory monitor's summary plus the
/// trimmed stdout/stderr tails, carried forward so a downstream validation
/// failure can still report them.
struct RenderOutcome {
    memory_summary: Option<route_models::MemorySnapshot>,
    stdout_tail: String,
    stderr_tail: String,
}

/// Process-wide orchestration state: the active jobs map, the admission
/// queue, per-job cancellation handles, and per-job event callbacks.
pub struct PipelineCoordinator {
    settings: Settings,
    runtime_binary: String,
    queue: Arc<AdmissionQueue>,
    jobs: Mutex<HashMap<String, RenderJob>>,
    contexts: Mutex<HashMap<String, JobContext>>,
    callbacks: Mutex<HashMap<String, EventCallback>>,
    history: Mutex<VecDeque<RenderJob>>,
}

impl PipelineCoordinator {
    pub fn new(settings: Settings, runtime_binary: impl Into<String>) -> Arc<Self> {
        let queue = Arc::new(AdmissionQueue::new(settings.orchestrator.max_concurrent));
        Arc::new(Self {
            settings,
            runtime_binary: runtime_binary.into(),
            queue,
            jobs: Mutex::new(HashMap::new()),
            contexts: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
        })
    }

    /// `startRender`: admits a job, registering its callback, and returns
    /// immediately with a handle. The pipeline runs on a background task.
    pub async fn start_render(
        self: Arc<Self>,
        request: RenderRequest,
        priority: i32,
        on_event: EventCallback,
    ) -> OrchestratorResult<JobHandle> {
        let output_id = request.output_id.clone();
        {
            let jobs = self.jobs.lock().await;
            if jobs.contains_key(&output_id) {
                return Err(OrchestratorError::Internal(format!(
                    "job {output_id} already exists"
                )));
            }
        }

        // The real animation speed/duration aren't known until ANALYZE and
        // PREPARE run; this placeholder is overwritten in place once the
        // real SpeedPlan exists.
        let placeholder_plan = SpeedPlan {
            multiplier: self.settings.animation.default_speed,
            video_duration_s: 0,
            rationale_tag: RationaleTag::Fixed,
        };
        let placeholder_config = RenderConfig::from_plan(
            request.route_file_path.clone(),
            request.route_filename.clone(),
            request.output_dir.clone(),
            request.output_id.clone(),
            request.user_name.clone(),
            self.settings.recording.fps,
            self.settings.recording.width,
            self.settings.recording.height,
            placeholder_plan,
        );

        self.jobs
            .lock()
            .await
            .insert(output_id.clone(), RenderJob::new(placeholder_config));
        self.callbacks.lock().await.insert(output_id.clone(), on_event);
        self.queue.enqueue(output_id.clone(), priority).await;

        self.dispatch_pending().await;

        Ok(JobHandle { output_id })
    }

    /// `getRenderStatus`.
    pub async fn get_render_status(&self, output_id: &str) -> Option<StatusSnapshot> {
        let jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get(output_id) {
            return Some(Self::snapshot_of(job));
        }
        drop(jobs);
        let history = self.history.lock().await;
        history
            .iter()
            .find(|job| job.output_id() == output_id)
            .map(Self::snapshot_of)
    }

    fn snapshot_of(job: &RenderJob) -> StatusSnapshot {
        StatusSnapshot {
            output_id: job.output_id().to_string(),
            stage: job.stage,
            progress_percent: job.progress_percent,
            elapsed_ms: (Utc::now() - job.started_at).num_milliseconds().max(0) as u64,
            logs_url: job.config.recorder_log_path().display().to_string(),
        }
    }

    /// `cancelRender`: cooperative. A still-queued job is removed from the
    /// line immediately; a running job's cancel signal is flipped and the
    /// in-flight pipeline observes it at its next checkpoint.
    pub async fn cancel_render(&self, output_id: &str) -> CancelOutcome {
        if self.queue.cancel_waiting(output_id).await {
            let mut jobs = self.jobs.lock().await;
            if let Some(job) = jobs.get_mut(output_id) {
                job.cancel();
            }
            return CancelOutcome {
                success: true,
                message: "removed from queue before it started".to_string(),
            };
        }

        let contexts = self.contexts.lock().await;
        if let Some(context) = contexts.get(output_id) {
            let _ = context.cancel_tx.send(true);
            return CancelOutcome {
                success: true,
                message: "cancel requested".to_string(),
            };
        }

        CancelOutcome {
            success: false,
            message: "no such job, or it already finished".to_string(),
        }
    }

    /// `getActiveRenders`.
    pub async fn get_active_renders(&self) -> Vec<StatusSnapshot> {
        self.jobs.lock().await.values().map(Self::snapshot_of).collect()
    }

    /// `getStats`.
    pub async fn get_stats(&self) -> Stats {
        let snapshot = self.queue.snapshot().await;
        let history = self.history.lock().await;
        let completed = history
            .iter()
            .filter(|j| matches!(j.completion, Completion::Success { .. }))
            .count();
        let failed = history.len() - completed;
        Stats {
            running: snapshot.running.len(),
            queued: snapshot.queued.len(),
            completed,
            failed,
            queued_jobs: snapshot.queued,
            running_jobs: snapshot.running,
        }
    }

    // Returns a type-erased boxed future (rather than `impl Future` / an
    // `async fn`) to break the recursive future-type cycle with
    // `execute_job` (each spawns/awaits the other), which otherwise makes
    // the compiler unable to prove the spawned task's future is `Send`.
    fn dispatch_pending(
        self: Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            while let Some(output_id) = self.queue.try_dispatch().await {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    coordinator.execute_job(output_id).await;
                });
            }
        })
    }

    async fn execute_job(self: Arc<Self>, output_id: String) {
        let guard = JobGuard::new(self.queue.clone(), output_id.clone());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.contexts
            .lock()
            .await
            .insert(output_id.clone(), JobContext { cancel_tx });

        let result = self.clone().run_pipeline(&output_id, cancel_rx).await;

        match result {
            Ok(facts) => self.complete_job(&output_id, facts).await,
            Err(err) => self.fail_job(&output_id, err).await,
        }

        self.contexts.lock().await.remove(&output_id);
        self.callbacks.lock().await.remove(&output_id);
        guard.finish().await;
        self.dispatch_pending().await;
    }

    async fn run_pipeline(
        self: Arc<Self>,
        output_id: &str,
        cancel_rx: watch::Receiver<bool>,
    ) -> OrchestratorResult<CompletionFacts> {
        let (route_file_path, route_filename, output_dir, user_name) = {
            let jobs = self.jobs.lock().await;
            let job = jobs
                .get(output_id)
                .ok_or_else(|| OrchestratorError::NotFound(output_id.to_string()))?;
            (
                job.config.route_file_path.clone(),
                job.config.route_filename.clone(),
                job.config.output_dir.clone(),
                job.config.user_name.clone(),
            )
        };

        // ANALYZE
        self.advance_stage(output_id, JobStage::Analyze, "analyzing route")
            .await;
        let analysis_start = Instant::now();
        let analyze_path = route_file_path.clone();
        let profile: RouteProfile =
            tokio::task::spawn_blocking(move || route_analyzer::analyze_route(&analyze_path))
                .await
                .map_err(|e| OrchestratorError::Internal(e.to_string()))??;
        let analysis_ms = analysis_start.elapsed().as_millis() as u64;

        if is_canceled(&cancel_rx) {
            return Err(OrchestratorError::Canceled);
        }

        // PREPARE
        self.advance_stage(output_id, JobStage::Prepare, "building render configuration")
            .await;
        let plan = route_planner::plan_speed(&profile, &self.settings.animation);
        let request = RenderRequest {
            route_file_path: route_file_path.clone(),
            route_filename: route_filename.clone(),
            output_dir: output_dir.clone(),
            output_id: output_id.to_string(),
            user_name: user_name.clone(),
        };
        let config = route_planner::build_config(request, plan, &self.settings.recording)?;

        write_overlay_data(&config, &profile)
            .await
            .map_err(|e| OrchestratorError::Internal(e.to_string()))?;

        {
            let mut jobs = self.jobs.lock().await;
            if let Some(job) = jobs.get_mut(output_id) {
                job.config = config.clone();
            }
        }

        if is_canceled(&cancel_rx) {
            return Err(OrchestratorError::Canceled);
        }

        // RENDER
        self.advance_stage(output_id, JobStage::Render, "rendering").await;
        let render_start = Instant::now();
        let render_outcome = self
            .clone()
            .run_render(output_id, &config, cancel_rx.clone())
            .await?;

        if is_canceled(&cancel_rx) {
            return Err(OrchestratorError::Canceled);
        }

        // VALIDATE
        self.advance_stage(output_id, JobStage::Validate, "validating output")
            .await;
        let started_at = {
            let jobs = self.jobs.lock().await;
            jobs.get(output_id)
                .ok_or_else(|| OrchestratorError::NotFound(output_id.to_string()))?
                .started_at
        };
        let validated = route_validator::validate_output(&config, started_at).map_err(|e| {
            let payload = ErrorPayload::new(ErrorKind::Validation, e.to_string()).with_tails(
                render_outcome.stdout_tail.clone(),
                render_outcome.stderr_tail.clone(),
            );
            OrchestratorError::ValidationFailed(payload)
        })?;
        let render_ms = render_start.elapsed().as_millis() as u64;

        Ok(CompletionFacts {
            video_url: format!("/output/{output_id}/route-video.mp4"),
            file_size: validated.size_bytes,
            animation_speed: config.animation_speed,
            video_duration_s: config.video_duration_s,
            route_duration_minutes: profile.duration_minutes(),
            video_width: config.width,
            video_height: config.height,
            analysis_ms,
            render_ms,
            memory_summary: render_outcome.memory_summary,
            logs_url: config.recorder_log_path().display().to_string(),
        })
    }

    /// Runs the render container and its concurrent memory monitor,
    /// returning the finished monitor's summary plus the container's
    /// trimmed stdout/stderr tails, kept around in case VALIDATE fails on
    /// an exit-0 container and needs them for diagnostics.
    async fn run_render(
        self: Arc<Self>,
        output_id: &str,
        config: &RenderConfig,
        cancel_rx: watch::Receiver<bool>,
    ) -> OrchestratorResult<RenderOutcome> {
        let command = ContainerCommand::new(self.runtime_binary.clone(), config.clone()).build();
        let runner = ContainerRunner::new()
            .with_cancel(cancel_rx)
            .with_timeout(Duration::from_millis(self.settings.orchestrator.job_timeout_ms));

        let (progress_lo, progress_hi) = (
            self.settings.orchestrator.progress_map_lo,
            self.settings.orchestrator.progress_map_hi,
        );
        let progress_coordinator = self.clone();
        let progress_output_id = output_id.to_string();
        let on_progress = move |progress: route_executor::FrameProgress| {
            let coordinator = progress_coordinator.clone();
            let output_id = progress_output_id.clone();
            let percent = progress.overall_progress(progress_lo, progress_hi);
            tokio::spawn(async move {
                coordinator.set_progress(&output_id, percent, "rendering").await;
            });
        };

        let (pid_tx, pid_rx) = tokio::sync::oneshot::channel();
        let on_spawn = move |pid: u32| {
            let _ = pid_tx.send(pid);
        };

        let (mem_stop_tx, mem_stop_rx) = watch::channel(false);
        let (mem_event_tx, mut mem_event_rx) = mpsc::unbounded_channel();
        let memory_settings = self.settings.memory;
        let mem_events_coordinator = self.clone();
        let mem_events_output_id = output_id.to_string();
        let mem_events_task = tokio::spawn(async move {
            while let Some(event) = mem_event_rx.recv().await {
                let (rss_mb, critical) = match event {
                    MemoryEvent::Warning { rss_mb } => (rss_mb, false),
                    MemoryEvent::Critical { rss_mb } => (rss_mb, true),
                };
                mem_events_coordinator
                    .emit(
                        &mem_events_output_id,
                        JobEvent::MemoryWarning {
                            output_id: mem_events_output_id.clone(),
                            rss_mb,
                            critical,
                        },
                    )
                    .await;
            }
        });

        let monitor_task = tokio::spawn(async move {
            let pid = match pid_rx.await {
                Ok(pid) => pid,
                Err(_) => return None,
            };
            let monitor = MemoryMonitor::new(
                pid,
                MemoryMonitorConfig {
                    interval: Duration::from_millis(memory_settings.check_interval_ms),
                    warning_threshold_mb: memory_settings.warning_threshold_mb,
                    critical_threshold_mb: memory_settings.critical_threshold_mb,
                    sample_capacity: memory_settings.sample_capacity,
                },
            );
            Some(monitor.run(mem_stop_rx, mem_event_tx).await)
        });

        let exec_result = runner
            .run_with_progress(command, config, on_progress, on_spawn)
            .await?;

        let _ = mem_stop_tx.send(true);
        let memory_summary = monitor_task.await.unwrap_or(None);
        let _ = mem_events_task.await;

        if exec_result.exit_code != 0 {
            let payload = ErrorPayload::new(
                ErrorKind::ContainerExit,
                format!("render container exited with code {}", exec_result.exit_code),
            )
            .with_exit_code(exec_result.exit_code)
            .with_tails(exec_result.stdout_tail, exec_result.stderr_tail);
            return Err(OrchestratorError::ExecutionFailed(payload));
        }

        Ok(RenderOutcome {
            memory_summary,
            stdout_tail: exec_result.stdout_tail,
            stderr_tail: exec_result.stderr_tail,
        })
    }

    async fn advance_stage(&self, output_id: &str, stage: JobStage, message: &str) {
        let progress_percent = {
            let mut jobs = self.jobs.lock().await;
            match jobs.get_mut(output_id) {
                Some(job) => {
                    job.advance(stage, message);
                    job.progress_percent
                }
                None => return,
            }
        };
        JobLogger::new(output_id, stage).log_start();
        self.emit(
            output_id,
            JobEvent::StageChanged {
                output_id: output_id.to_string(),
                stage,
                progress_percent,
                message: message.to_string(),
            },
        )
        .await;
    }

    async fn set_progress(&self, output_id: &str, percent: u8, message: &str) {
        let progress_percent = {
            let mut jobs = self.jobs.lock().await;
            match jobs.get_mut(output_id) {
                Some(job) => {
                    job.set_progress(percent, message);
                    job.progress_percent
                }
                None => return,
            }
        };
        self.emit(
            output_id,
            JobEvent::Progress {
                output_id: output_id.to_string(),
                progress_percent,
                message: message.to_string(),
            },
        )
        .await;
    }

    async fn complete_job(&self, output_id: &str, facts: CompletionFacts) {
        let completion = {
            let mut jobs = self.jobs.lock().await;
            match jobs.get_mut(output_id) {
                Some(job) => {
                    job.succeed(facts);
                    job.completion.clone()
                }
                None => return,
            }
        };
        JobLogger::new(output_id, JobStage::Complete).log_completion();
        self.emit(
            output_id,
            JobEvent::Complete {
                output_id: output_id.to_string(),
                completion,
            },
        )
        .await;
        self.retire(output_id).await;
    }

    async fn fail_job(&self, output_id: &str, err: OrchestratorError) {
        let is_cancel = matches!(
            err,
            OrchestratorError::Canceled
                | OrchestratorError::Execute(route_executor::ExecutorError::Canceled)
        );
        let is_timeout = matches!(
            err,
            OrchestratorError::Timeout
                | OrchestratorError::Execute(route_executor::ExecutorError::Timeout)
        );
        let payload = err.to_payload();

        let terminal_stage = if is_cancel || is_timeout {
            JobStage::Canceled
        } else {
            JobStage::Failed
        };
        JobLogger::new(output_id, terminal_stage).log_error(&payload.detail);

        let completion = {
            let mut jobs = self.jobs.lock().await;
            match jobs.get_mut(output_id) {
                Some(job) => {
                    if is_cancel {
                        job.cancel();
                    } else if is_timeout {
                        job.cancel_with_payload(ErrorPayload::new(ErrorKind::Timeout, "job exceeded its wall-clock timeout"));
                    } else {
                        job.fail(payload.clone());
                    }
                    job.completion.clone()
                }
                None => return,
            }
        };

        if is_cancel || is_timeout {
            self.emit(
                output_id,
                JobEvent::Complete {
                    output_id: output_id.to_string(),
                    completion,
                },
            )
            .await;
        } else {
            self.emit(
                output_id,
                JobEvent::Error {
                    output_id: output_id.to_string(),
                    payload,
                },
            )
            .await;
        }

        self.retire(output_id).await;
    }

    async fn retire(&self, output_id: &str) {
        let job = self.jobs.lock().await.remove(output_id);
        if let Some(job) = job {
            let mut history = self.history.lock().await;
            if history.len() >= self.settings.orchestrator.history_cap {
                history.pop_front();
            }
            history.push_back(job);
        }
    }

    async fn emit(&self, output_id: &str, event: JobEvent) {
        let callback = self.callbacks.lock().await.get(output_id).cloned();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

fn is_canceled(cancel_rx: &watch::Receiver<bool>) -> bool {
    *cancel_rx.borrow()
}

async fn write_overlay_data(config: &RenderConfig, profile: &RouteProfile) -> std::io::Result<()> {
    let data = OverlayData {
        distance_m: profile.distance_m,
        elevation_gain_m: profile.elevation_gain_m,
        elevation_loss_m: profile.elevation_loss_m,
        duration_s: profile.duration_s,
        pattern_tag: profile.pattern_tag.as_str(),
        pattern_confidence: profile.pattern_confidence,
        overlay_hooks: &profile.overlay_hooks,
        animation_speed: config.animation_speed,
        video_duration_s: config.video_duration_s,
        generated_at: Utc::now(),
    };
    let json = serde_json::to_vec_pretty(&data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    if let Some(parent) = config.overlay_data_path().parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(config.overlay_data_path(), json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_models::RoutePoint;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn gpx_route(points: &[(f64, f64)]) -> String {
        let mut body = String::from("<gpx><trk><trkseg>");
        for (lat, lon) in points {
            body.push_str(&format!("<trkpt lat=\"{lat}\" lon=\"{lon}\"></trkpt>"));
        }
        body.push_str("</trkseg></trk></gpx>");
        body
    }

    #[tokio::test]
    async fn start_render_rejects_duplicate_output_ids() {
        let dir = TempDir::new().unwrap();
        let route_path = dir.path().join("route.gpx");
        std::fs::write(&route_path, gpx_route(&[(0.0, 0.0), (0.0, 0.01)])).unwrap();

        let coordinator = PipelineCoordinator::new(Settings::default(), "docker");
        let events: Arc<StdMutex<Vec<JobEvent>>> = Arc::new(StdMutex::new(Vec::new()));
        let events_for_cb = events.clone();
        let callback: EventCallback = Arc::new(move |event| {
            events_for_cb.lock().unwrap().push(event);
        });

        let request = RenderRequest {
            route_file_path: route_path.clone(),
            route_filename: "route.gpx".into(),
            output_dir: dir.path().to_path_buf(),
            output_id: "dup-job".into(),
            user_name: "alice".into(),
        };
        coordinator
            .clone()
            .start_render(request, 0, callback.clone())
            .await
            .unwrap();

        let second = RenderRequest {
            route_file_path: route_path,
            route_filename: "route.gpx".into(),
            output_dir: dir.path().to_path_buf(),
            output_id: "dup-job".into(),
            user_name: "alice".into(),
        };
        let err = coordinator
            .clone()
            .start_render(second, 0, callback)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Internal(_)));
    }

    #[tokio::test]
    async fn cancel_render_on_unknown_job_reports_failure() {
        let coordinator = PipelineCoordinator::new(Settings::default(), "docker");
        let outcome = coordinator.cancel_render("does-not-exist").await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn get_stats_reports_empty_state_initially() {
        let coordinator = PipelineCoordinator::new(Settings::default(), "docker");
        let stats = coordinator.get_stats().await;
        assert_eq!(stats.running, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn write_overlay_data_creates_the_expected_file() {
        let dir = TempDir::new().unwrap();
        let config = RenderConfig::from_plan(
            dir.path().join("route.gpx"),
            "route.gpx".into(),
            dir.path().to_path_buf(),
            "abc123".into(),
            "alice".into(),
            30,
            720,
            1280,
            SpeedPlan {
                multiplier: 2,
                video_duration_s: 60,
                rationale_tag: RationaleTag::Fixed,
            },
        );
        let profile = route_analyzer::analyze_points(vec![
            RoutePoint::new(0.0, 0.0),
            RoutePoint::new(0.0, 0.01),
        ])
        .unwrap();

        write_overlay_data(&config, &profile).await.unwrap();
        let written = std::fs::read_to_string(config.overlay_data_path()).unwrap();
        assert!(written.contains("animation_speed"));
    }
}
