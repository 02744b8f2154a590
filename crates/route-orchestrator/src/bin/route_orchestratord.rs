//! Orchestrator process entrypoint.
//!
//! Boots structured logging, layers settings (defaults -> optional config
//! file -> environment overrides), and exposes the Control API through a
//! small CLI surface. `serve` is the long-running mode; the other
//! subcommands are one-shot calls useful for scripting and local testing
//! without a front layer in place.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use route_models::{JobEvent, Settings};
use route_orchestrator::{EventCallback, PipelineCoordinator};
use route_planner::RenderRequest;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "route-orchestratord", about = "Route render orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a route file for rendering and wait for the result.
    Submit {
        route_file_path: PathBuf,
        route_filename: String,
        output_dir: PathBuf,
        output_id: String,
        user_name: String,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Print the current status of a job, by output_id.
    Status { output_id: String },
    /// Request cancellation of a queued or running job.
    Cancel { output_id: String },
    /// Print process-wide queue and throughput statistics.
    Stats,
    /// Run indefinitely, accepting no further CLI input, until SIGINT.
    Serve,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("route_orchestrator=info".parse().unwrap()))
        .init();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let runtime_binary = if which::which("docker").is_ok() {
        "docker"
    } else {
        "podman"
    };
    info!(runtime_binary, "starting route-orchestratord");

    let coordinator = PipelineCoordinator::new(settings, runtime_binary);
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Submit {
            route_file_path,
            route_filename,
            output_dir,
            output_id,
            user_name,
            priority,
        } => {
            run_submit(
                coordinator,
                RenderRequest {
                    route_file_path,
                    route_filename,
                    output_dir,
                    output_id,
                    user_name,
                },
                priority,
            )
            .await
        }
        Command::Status { output_id } => run_status(coordinator, &output_id).await,
        Command::Cancel { output_id } => run_cancel(coordinator, &output_id).await,
        Command::Stats => run_stats(coordinator).await,
        Command::Serve => run_serve().await,
    };

    std::process::exit(exit_code);
}

fn load_settings() -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);
    if let Ok(path) = std::env::var("ROUTE_ORCHESTRATOR_CONFIG") {
        builder = builder.add_source(config::File::with_name(&path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("ROUTE")
            .separator("__")
            .try_parsing(true),
    );
    builder.build()?.try_deserialize()
}

async fn run_submit(coordinator: Arc<PipelineCoordinator>, request: RenderRequest, priority: i32) -> i32 {
    let (done_tx, done_rx) = oneshot::channel();
    let done_tx = std::sync::Mutex::new(Some(done_tx));
    let callback: EventCallback = Arc::new(move |event| {
        if let JobEvent::Complete { ref completion, .. } = event {
            if let Some(tx) = done_tx.lock().unwrap().take() {
                let _ = tx.send(completion.clone());
            }
        }
        if let Ok(json) = serde_json::to_string(&event) {
            info!(event = %json, "job event");
        }
    });

    match coordinator.start_render(request, priority, callback).await {
        Ok(handle) => info!(output_id = %handle.output_id, "submitted"),
        Err(e) => {
            error!("submit failed: {e}");
            return 1;
        }
    }

    match done_rx.await {
        Ok(completion) => {
            println!("{}", serde_json::to_string_pretty(&completion).unwrap());
            match completion {
                route_models::Completion::Success { .. } => 0,
                _ => 1,
            }
        }
        Err(_) => {
            error!("job channel closed before completion");
            1
        }
    }
}

async fn run_status(coordinator: Arc<PipelineCoordinator>, output_id: &str) -> i32 {
    match coordinator.get_render_status(output_id).await {
        Some(status) => {
            println!(
                "{}",
                serde_json::json!({
                    "output_id": status.output_id,
                    "stage": status.stage,
                    "progress": status.progress_percent,
                    "elapsed_ms": status.elapsed_ms,
                    "logs_url": status.logs_url,
                })
            );
            0
        }
        None => {
            println!("null");
            1
        }
    }
}

async fn run_cancel(coordinator: Arc<PipelineCoordinator>, output_id: &str) -> i32 {
    let outcome = coordinator.cancel_render(output_id).await;
    println!(
        "{}",
        serde_json::json!({ "success": outcome.success, "message": outcome.message })
    );
    if outcome.success {
        0
    } else {
        1
    }
}

async fn run_stats(coordinator: Arc<PipelineCoordinator>) -> i32 {
    let stats = coordinator.get_stats().await;
    println!(
        "{}",
        serde_json::json!({
            "running": stats.running,
            "queued": stats.queued,
            "completed": stats.completed,
            "failed": stats.failed,
            "queued_jobs": stats.queued_jobs,
            "running_jobs": stats.running_jobs,
        })
    );
    0
}

async fn run_serve() -> i32 {
    info!("route-orchestratord ready, awaiting shutdown signal");
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
    0
}
