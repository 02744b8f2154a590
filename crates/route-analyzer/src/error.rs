use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to parse route file: {0}")]
    Parse(String),

    #[error("route has fewer than 2 usable track points")]
    EmptyRoute,

    #[error("route distance is too short to render ({0:.1} m)")]
    TooShort(f64),

    #[error("unsupported route file extension: {0}")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
