use thiserror::Error;

/// Errors that can occur within the confirmation scheduler (§4.13).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Core(#[from] salon_core::SalonError),

    #[error(transparent)]
    Channel(#[from] salon_channels::ChannelError),

    #[error("writing health record: {0}")]
    Health(#[from] std::io::Error),

    #[error("serialising health record: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
