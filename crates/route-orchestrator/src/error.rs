//! Orchestrator error types.

use route_models::{ErrorKind, ErrorPayload};
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("route analysis failed: {0}")]
    Analyze(#[from] route_analyzer::AnalyzerError),

    #[error("render configuration failed: {0}")]
    Plan(#[from] route_planner::PlannerError),

    #[error("container execution failed: {0}")]
    Execute(#[from] route_executor::ExecutorError),

    #[error("render timed out")]
    Timeout,

    #[error("render was canceled")]
    Canceled,

    #[error("unknown output_id: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// The render container exited non-zero; carries the full payload
    /// (exit code, stdout/stderr tails) gathered while it was still running.
    #[error("render container exited with a failure")]
    ExecutionFailed(ErrorPayload),

    /// The container exited 0 but the expected output artifact failed
    /// validation; carries the render's captured stdout/stderr tails for
    /// diagnostics, since the container itself reported no error.
    #[error("output validation failed")]
    ValidationFailed(ErrorPayload),
}

impl OrchestratorError {
    /// Renders this error into the wire-safe [`ErrorPayload`] attached to a
    /// terminated job.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            OrchestratorError::Analyze(route_analyzer::AnalyzerError::EmptyRoute) => {
                ErrorPayload::new(ErrorKind::EmptyRoute, self.to_string())
            }
            OrchestratorError::Analyze(route_analyzer::AnalyzerError::TooShort(_)) => {
                ErrorPayload::new(ErrorKind::TooShort, self.to_string())
            }
            OrchestratorError::Analyze(_) => ErrorPayload::new(ErrorKind::Parse, self.to_string()),
            OrchestratorError::Plan(_) => ErrorPayload::new(ErrorKind::Config, self.to_string()),
            OrchestratorError::Execute(route_executor::ExecutorError::Spawn(_)) => {
                ErrorPayload::new(ErrorKind::Spawn, self.to_string())
            }
            OrchestratorError::Execute(route_executor::ExecutorError::ContainerExit(code)) => {
                ErrorPayload::new(ErrorKind::ContainerExit, self.to_string()).with_exit_code(*code)
            }
            OrchestratorError::Execute(route_executor::ExecutorError::Timeout) => {
                ErrorPayload::new(ErrorKind::Timeout, self.to_string())
            }
            OrchestratorError::Execute(route_executor::ExecutorError::Canceled) => {
                ErrorPayload::new(ErrorKind::Canceled, self.to_string())
            }
            OrchestratorError::Timeout => ErrorPayload::new(ErrorKind::Timeout, self.to_string()),
            OrchestratorError::Canceled => {
                ErrorPayload::new(ErrorKind::Canceled, self.to_string())
            }
            OrchestratorError::NotFound(_) => {
                ErrorPayload::new(ErrorKind::Internal, self.to_string())
            }
            OrchestratorError::Internal(_) => {
                ErrorPayload::new(ErrorKind::Internal, self.to_string())
            }
            OrchestratorError::ExecutionFailed(payload) => payload.clone(),
            OrchestratorError::ValidationFailed(payload) => payload.clone(),
        }
    }

    /// Whether this failure should escalate into a cancel rather than a
    /// plain failure (wall-clock timeout, host memory exhaustion).
    pub fn is_escalating(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Timeout | OrchestratorError::Execute(route_executor::ExecutorError::Timeout)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failed_payload_keeps_the_stdout_stderr_tails() {
        let payload = ErrorPayload::new(ErrorKind::Validation, "missing output file")
            .with_tails("render log tail", "ffmpeg stderr tail");
        let err = OrchestratorError::ValidationFailed(payload);

        let to_payload = err.to_payload();
        assert_eq!(to_payload.stdout_tail.as_deref(), Some("render log tail"));
        assert_eq!(to_payload.stderr_tail.as_deref(), Some("ffmpeg stderr tail"));
    }
}
