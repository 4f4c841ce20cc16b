use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChartflowError>;

#[derive(Debug, Error)]
pub enum ChartflowError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
