//! The confirmation scheduler (C13, §4.13): three fixed periodic jobs —
//! send booking confirmations, auto-cancel unconfirmed bookings, and send
//! reminders — each writing a health-check record after every run.

pub mod engine;
pub mod error;
pub mod health;
pub mod jobs;
pub mod schedule;
pub mod types;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use types::{HealthRecord, HealthStatus, JobName};
