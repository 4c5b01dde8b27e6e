use chrono::{DateTime, Duration, Utc};
use salon_core::domain::{Appointment, AppointmentStatus};
use salon_core::types::{AppointmentId, CustomerId, ServiceId, StylistId};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

#[derive(FromRow)]
struct AppointmentRow {
    id: String,
    customer_id: String,
    stylist_id: String,
    service_ids: String,
    start_time: String,
    duration_minutes: i64,
    status: String,
    confirmation_sent_at: Option<String>,
    reminder_sent_at: Option<String>,
    cancelled_at: Option<String>,
    calendar_event_id: Option<String>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = salon_core::SalonError;

    fn try_from(r: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: AppointmentId(r.id),
            customer_id: CustomerId(r.customer_id),
            stylist_id: StylistId(r.stylist_id),
            service_ids: r
                .service_ids
                .split(',')
                .filter(|s| !s.is_empty())
                .map(ServiceId::from)
                .collect(),
            start_time: parse_ts(&r.start_time)?,
            duration_minutes: r.duration_minutes as i32,
            status: AppointmentStatus::from_str(&r.status)?,
            confirmation_sent_at: r.confirmation_sent_at.as_deref().map(parse_ts).transpose()?,
            reminder_sent_at: r.reminder_sent_at.as_deref().map(parse_ts).transpose()?,
            cancelled_at: r.cancelled_at.as_deref().map(parse_ts).transpose()?,
            calendar_event_id: r.calendar_event_id,
        })
    }
}

fn parse_ts(s: &str) -> salon_core::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| salon_core::SalonError::Internal(format!("bad timestamp {s}: {e}")))
}

/// Statuses that occupy a stylist's calendar for overlap purposes. A
/// cancelled or no-show appointment does not block a new booking.
const ACTIVE_STATUSES: [&str; 2] = ["PENDING", "CONFIRMED"];

#[instrument(skip(pool))]
pub async fn get_by_id(
    pool: &SqlitePool,
    id: &AppointmentId,
) -> salon_core::Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        "SELECT id, customer_id, stylist_id, service_ids, start_time, duration_minutes,
                status, confirmation_sent_at, reminder_sent_at, cancelled_at, calendar_event_id
         FROM appointments WHERE id = ?1",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(Appointment::try_from).transpose()
}

/// Active appointments for a customer, most recent first (`CHECK_MY_APPOINTMENTS`,
/// SPEC_FULL.md §4.14).
#[instrument(skip(pool))]
pub async fn list_active_by_customer(
    pool: &SqlitePool,
    customer_id: &CustomerId,
) -> salon_core::Result<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        "SELECT id, customer_id, stylist_id, service_ids, start_time, duration_minutes,
                status, confirmation_sent_at, reminder_sent_at, cancelled_at, calendar_event_id
         FROM appointments
         WHERE customer_id = ?1 AND status IN ('PENDING', 'CONFIRMED')
         ORDER BY start_time DESC",
    )
    .bind(customer_id.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Appointment::try_from).collect()
}

/// Appointments in `[window_start, window_end)` matching any of the given
/// statuses, used by the scheduler's three periodic jobs (§4.13).
#[instrument(skip(pool))]
pub async fn list_in_window(
    pool: &SqlitePool,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    statuses: &[AppointmentStatus],
) -> salon_core::Result<Vec<Appointment>> {
    let placeholders = statuses
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT id, customer_id, stylist_id, service_ids, start_time, duration_minutes,
                status, confirmation_sent_at, reminder_sent_at, cancelled_at, calendar_event_id
         FROM appointments
         WHERE start_time >= ?1 AND start_time < ?2 AND status IN ({placeholders})
         ORDER BY start_time ASC"
    );

    let mut query = sqlx::query_as::<_, AppointmentRow>(&sql)
        .bind(window_start.to_rfc3339())
        .bind(window_end.to_rfc3339());
    for status in statuses {
        query = query.bind(status.as_str());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Appointment::try_from).collect()
}

/// Does `[start, start + duration)` overlap any active appointment for this
/// stylist? Used both as the pre-check inside `insert_checked` and standalone
/// by `check_availability`/`find_next_available` slot generation (§4.6).
#[instrument(skip(pool))]
pub async fn has_overlap(
    pool: &SqlitePool,
    stylist_id: &StylistId,
    start: DateTime<Utc>,
    duration_minutes: i32,
) -> salon_core::Result<bool> {
    has_overlap_excluding(pool, stylist_id, start, duration_minutes, None).await
}

async fn has_overlap_excluding(
    pool: &SqlitePool,
    stylist_id: &StylistId,
    start: DateTime<Utc>,
    duration_minutes: i32,
    exclude_id: Option<&AppointmentId>,
) -> salon_core::Result<bool> {
    let end = start + Duration::minutes(duration_minutes as i64);

    // A candidate overlaps an existing booking unless it ends at or before
    // the booking starts, or starts at or after the booking ends. Lexical
    // comparison on RFC-3339 UTC strings is order-preserving.
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT start_time, duration_minutes FROM appointments
         WHERE stylist_id = ?1 AND status IN ('PENDING', 'CONFIRMED')
           AND start_time < ?2 AND id != COALESCE(?3, '')",
    )
    .bind(stylist_id.as_str())
    .bind(end.to_rfc3339())
    .bind(exclude_id.map(AppointmentId::as_str).unwrap_or(""))
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    for (existing_start, existing_duration) in rows {
        let existing_start = parse_ts(&existing_start)?;
        let existing_end = existing_start + Duration::minutes(existing_duration);
        if start < existing_end && end > existing_start {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Transactional booking commit (§6.5): re-checks the overlap inside the
/// same transaction as the insert, so a concurrent booking cannot slip
/// between the check and the write.
#[instrument(skip(pool))]
pub async fn insert_checked(
    pool: &SqlitePool,
    customer_id: &CustomerId,
    stylist_id: &StylistId,
    service_ids: &[ServiceId],
    start: DateTime<Utc>,
    duration_minutes: i32,
) -> salon_core::Result<Appointment> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    let end = start + Duration::minutes(duration_minutes as i64);
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT start_time, duration_minutes FROM appointments
         WHERE stylist_id = ?1 AND status IN ('PENDING', 'CONFIRMED') AND start_time < ?2",
    )
    .bind(stylist_id.as_str())
    .bind(end.to_rfc3339())
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    for (existing_start, existing_duration) in rows {
        let existing_start = parse_ts(&existing_start)?;
        let existing_end = existing_start + Duration::minutes(existing_duration);
        if start < existing_end && end > existing_start {
            return Err(salon_core::SalonError::BookingConflict);
        }
    }

    let id = AppointmentId::new();
    let service_ids_joined = service_ids
        .iter()
        .map(ServiceId::as_str)
        .collect::<Vec<_>>()
        .join(",");

    sqlx::query(
        "INSERT INTO appointments
            (id, customer_id, stylist_id, service_ids, start_time, duration_minutes, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING')",
    )
    .bind(id.as_str())
    .bind(customer_id.as_str())
    .bind(stylist_id.as_str())
    .bind(&service_ids_joined)
    .bind(start.to_rfc3339())
    .bind(duration_minutes as i64)
    .execute(&mut *tx)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    tx.commit()
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(Appointment {
        id,
        customer_id: customer_id.clone(),
        stylist_id: stylist_id.clone(),
        service_ids: service_ids.to_vec(),
        start_time: start,
        duration_minutes,
        status: AppointmentStatus::Pending,
        confirmation_sent_at: None,
        reminder_sent_at: None,
        cancelled_at: None,
        calendar_event_id: None,
    })
}

/// The appointment a `CONFIRM_APPOINTMENT`/`DECLINE_APPOINTMENT` reply is
/// about (§4.13 tail paragraph): the `PENDING` appointment for this customer
/// that a confirmation template has already gone out for. There is at most
/// one by construction — the scheduler's confirmation job only ever sends
/// one 48h-out confirmation per appointment, and a customer normally only
/// has one upcoming appointment in this window at a time — so the most
/// recent `confirmation_sent_at` wins if more than one somehow qualifies.
#[instrument(skip(pool))]
pub async fn find_awaiting_reply(
    pool: &SqlitePool,
    customer_id: &CustomerId,
) -> salon_core::Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        "SELECT id, customer_id, stylist_id, service_ids, start_time, duration_minutes,
                status, confirmation_sent_at, reminder_sent_at, cancelled_at, calendar_event_id
         FROM appointments
         WHERE customer_id = ?1 AND status = 'PENDING' AND confirmation_sent_at IS NOT NULL
         ORDER BY confirmation_sent_at DESC
         LIMIT 1",
    )
    .bind(customer_id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(Appointment::try_from).transpose()
}

#[instrument(skip(pool))]
pub async fn set_status(
    pool: &SqlitePool,
    id: &AppointmentId,
    status: AppointmentStatus,
) -> salon_core::Result<()> {
    let cancelled_at = matches!(status, AppointmentStatus::Cancelled).then(|| Utc::now().to_rfc3339());
    sqlx::query("UPDATE appointments SET status = ?1, cancelled_at = COALESCE(?2, cancelled_at) WHERE id = ?3")
        .bind(status.as_str())
        .bind(cancelled_at)
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn mark_confirmation_sent(pool: &SqlitePool, id: &AppointmentId) -> salon_core::Result<()> {
    sqlx::query("UPDATE appointments SET confirmation_sent_at = ?1 WHERE id = ?2")
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn mark_reminder_sent(pool: &SqlitePool, id: &AppointmentId) -> salon_core::Result<()> {
    sqlx::query("UPDATE appointments SET reminder_sent_at = ?1 WHERE id = ?2")
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn set_calendar_event_id(
    pool: &SqlitePool,
    id: &AppointmentId,
    calendar_event_id: &str,
) -> salon_core::Result<()> {
    sqlx::query("UPDATE appointments SET calendar_event_id = ?1 WHERE id = ?2")
        .bind(calendar_event_id)
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    Ok(())
}
