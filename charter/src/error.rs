use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize chart: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
