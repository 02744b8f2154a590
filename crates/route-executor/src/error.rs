use thiserror::Error;

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn render container: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("render container exited with code {0}")]
    ContainerExit(i32),

    #[error("render container timed out")]
    Timeout,

    #[error("render was canceled")]
    Canceled,
}
