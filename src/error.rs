use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] tiberius::error::Error),

    #[error("Warehouse unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation not allowed: {0}. This interface is read-only.")]
    ForbiddenKeyword(&'static str),

    #[error("Only SELECT queries are allowed")]
    NotSelect,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
