use thiserror::Error;

/// Failure to construct one of the LLM-backed agents.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid response pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid agent settings: {0}")]
    Settings(String),
}
