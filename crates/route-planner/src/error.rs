use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("route file path must be absolute: {0}")]
    PathNotAbsolute(String),

    #[error("output directory must be absolute: {0}")]
    OutputDirNotAbsolute(String),

    #[error("output_id is invalid, must match [A-Za-z0-9_-]+: {0}")]
    InvalidOutputId(String),
}
