#![deny(unreachable_patterns)]

//! Pipeline Coordinator and supporting plumbing: the process that wires
//! the route-analyzer, route-planner, route-executor, route-validator,
//! and route-queue crates into the full render pipeline.

pub mod coordinator;
pub mod error;
pub mod job_guard;
pub mod logging;

pub use coordinator::{CancelOutcome, EventCallback, PipelineCoordinator, Stats, StatusSnapshot};
pub use error::{OrchestratorError, OrchestratorResult};
pub use job_guard::JobGuard;
pub use logging::JobLogger;
