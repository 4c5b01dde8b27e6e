use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Tool(#[from] salon_tools::ToolError),

    #[error(transparent)]
    Action(#[from] salon_fsm::action::ActionError),

    #[error(transparent)]
    Core(#[from] salon_core::SalonError),

    #[error("required tool {tool} failed: {source}")]
    RequiredToolFailed {
        tool: String,
        #[source]
        source: salon_tools::ToolError,
    },
}

pub type Result<T> = std::result::Result<T, HandlerError>;
