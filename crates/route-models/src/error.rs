use serde::{Deserialize, Serialize};

/// The stable, wire-safe kind of a pipeline failure.
///
/// This mirrors the taxonomy of the various crate-local `thiserror` enums
/// without pulling their crate dependencies into `route-models`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    EmptyRoute,
    TooShort,
    Config,
    Spawn,
    ContainerExit,
    ContainerIo,
    Validation,
    Timeout,
    Canceled,
    MemoryCritical,
    Internal,
}

/// Enriched failure record attached to a terminated job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_tail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_tail: Option<String>,
}

impl ErrorPayload {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            exit_code: None,
            stdout_tail: None,
            stderr_tail: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn with_tails(mut self, stdout_tail: impl Into<String>, stderr_tail: impl Into<String>) -> Self {
        self.stdout_tail = Some(stdout_tail.into());
        self.stderr_tail = Some(stderr_tail.into());
        self
    }
}
