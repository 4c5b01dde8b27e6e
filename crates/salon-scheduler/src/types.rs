use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three fixed periodic jobs (§4.13). Unlike a general-purpose job
/// store, this schedule is not user-configurable — the confirmation flow
/// defines exactly these three timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobName {
    /// Daily at 10:00 UTC: send the 48h-ahead confirmation request.
    SendConfirmations,
    /// Daily at 10:00 UTC: cancel PENDING appointments whose confirmation
    /// window has lapsed without a reply.
    AutoCancel,
    /// Hourly: send the 2h-ahead reminder.
    SendReminders,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::SendConfirmations => "send_confirmations",
            JobName::AutoCancel => "auto_cancel",
            JobName::SendReminders => "send_reminders",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health-check record written after every run of a job (§4.13).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub job: String,
    pub last_run: DateTime<Utc>,
    pub status: HealthStatus,
    pub processed: u32,
    pub errors: u32,
}

impl HealthRecord {
    pub fn new(job: JobName, last_run: DateTime<Utc>, processed: u32, errors: u32) -> Self {
        Self {
            job: job.as_str().to_string(),
            last_run,
            status: if errors == 0 {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            processed,
            errors,
        }
    }
}
