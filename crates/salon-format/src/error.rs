use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("template render failed: {0}")]
    Render(#[from] minijinja::Error),

    #[error("llm rewrite failed: {0}")]
    Llm(#[from] salon_intent::LlmError),
}

pub type Result<T> = std::result::Result<T, FormatError>;
