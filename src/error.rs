use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model service unavailable: {0}")]
    ModelUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Execution error: {0}")]
    Execution(String),

    /// A failure while repairing a query that already failed once.
    #[error("Repair failed after {attempts} attempt(s): {reason}")]
    Repair { attempts: u8, reason: String },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<polars::prelude::PolarsError> for AssistantError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        AssistantError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
