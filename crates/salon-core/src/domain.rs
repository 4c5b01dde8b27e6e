//! Persistent entities (§3.5) — the records consumed and mutated by tools.
//! These are plain data; the database crate owns their storage, and the
//! tools crate owns the operations that read or write them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppointmentId, CustomerId, ServiceId, StylistId};

/// A customer record, unique by phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub phone: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// Service category — the only two lines of business the salon runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    Hairdressing,
    Aesthetics,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Hairdressing => "HAIRDRESSING",
            ServiceCategory::Aesthetics => "AESTHETICS",
        }
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = crate::error::SalonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HAIRDRESSING" => Ok(ServiceCategory::Hairdressing),
            "AESTHETICS" => Ok(ServiceCategory::Aesthetics),
            other => Err(crate::error::SalonError::Internal(format!(
                "unknown service category: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stylist able to perform one or more categories of service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stylist {
    pub id: StylistId,
    pub name: String,
    pub categories: Vec<ServiceCategory>,
    pub calendar_id: String,
    pub active: bool,
}

/// A bookable catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: i32,
    pub category: ServiceCategory,
    pub active: bool,
}

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = crate::error::SalonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            "NO_SHOW" => Ok(AppointmentStatus::NoShow),
            other => Err(crate::error::SalonError::Internal(format!(
                "unknown appointment status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booked (or in-progress) appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub customer_id: CustomerId,
    pub stylist_id: StylistId,
    pub service_ids: Vec<ServiceId>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub calendar_event_id: Option<String>,
}

/// One weekday's operating window. `closed` takes priority over `start`/`end`
/// when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHours {
    /// 0 = Monday .. 6 = Sunday, matching `chrono::Weekday::num_days_from_monday`.
    pub day_of_week: u8,
    pub start: chrono::NaiveTime,
    pub end: chrono::NaiveTime,
    pub closed: bool,
}

/// A policy / FAQ entry. Stored as free-form JSON; FAQ entries are keyed
/// `faq_*` by convention (§4.10 non-booking prompt assembly relies on this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub key: String,
    pub value: serde_json::Value,
}

/// An admin-panel notification record, created alongside booking and
/// escalation side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub entity_type: String,
    pub entity_id: String,
}
