use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Core(#[from] salon_core::SalonError),

    #[error("unrecognised timezone {0}")]
    UnknownTimezone(String),
}

pub type Result<T> = std::result::Result<T, ValidateError>;
