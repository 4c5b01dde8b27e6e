pub mod config;
pub mod domain;
pub mod error;
pub mod types;

pub use config::SalonConfig;
pub use error::{ErrorKind, Result, SalonError};
