use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("openrouter returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// §7 category 2 ("transient external"): worth a backoff retry, as
    /// opposed to a permanent configuration or parse failure.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transport(e) => !e.is_builder(),
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::RateLimited { .. } => true,
            LlmError::MalformedResponse(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum IntentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("classifier returned unparseable JSON: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, IntentError>;
