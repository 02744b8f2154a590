use thiserror::Error;

/// Why the expected output failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Missing,
    Empty,
    Unreadable,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::Missing => "missing",
            ValidationReason::Empty => "empty",
            ValidationReason::Unreadable => "unreadable",
        }
    }
}

pub type ValidatorResult<T> = Result<T, ValidationError>;

#[derive(Debug, Error)]
#[error("output validation failed: {reason:?} ({detail})")]
pub struct ValidationError {
    pub reason: ValidationReason,
    pub detail: String,
}

impl ValidationError {
    pub fn new(reason: ValidationReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}
