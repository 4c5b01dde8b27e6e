use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Core(#[from] salon_core::SalonError),

    #[error(transparent)]
    Channel(#[from] salon_channels::ChannelError),

    #[error(transparent)]
    Validate(#[from] salon_validate::ValidateError),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{query}")]
    ServiceNotFound { query: String },

    #[error("ambiguous service query")]
    Ambiguous {
        query: String,
        options: Vec<salon_resolve::ServiceOption>,
    },
}

pub type Result<T> = std::result::Result<T, ToolError>;
