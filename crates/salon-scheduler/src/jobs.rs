//! The three fixed periodic jobs of the confirmation scheduler (§4.13). Each
//! runs against the database directly, rather than through the
//! conversational orchestrator, since no FSM transition is involved —
//! proactive sends to an appointment's customer are not a reply to a
//! message.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use salon_channels::{CalendarClient, MessagingGateway};
use salon_core::domain::{AppointmentStatus, Notification};
use sqlx::SqlitePool;
use tracing::{error, instrument, warn};

use crate::error::Result;
use crate::types::{HealthRecord, JobName};

async fn notify_admin(pool: &SqlitePool, notification_type: &str, title: &str, message: &str, entity_id: &str) {
    let notification = Notification {
        notification_type: notification_type.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        entity_type: "appointment".to_string(),
        entity_id: entity_id.to_string(),
    };
    if let Err(e) = salon_db::notifications::create(pool, &notification).await {
        warn!(error = %e, "failed to create admin notification");
    }
}

/// Send the confirmation request for every PENDING appointment starting
/// between `confirmation_hours_before` and `confirmation_hours_before - 1`
/// hours from now that hasn't had one sent yet.
#[instrument(skip(pool, gateway))]
pub async fn send_confirmations(
    pool: &SqlitePool,
    gateway: &dyn MessagingGateway,
    confirmation_hours_before: i64,
    now: DateTime<Utc>,
) -> Result<HealthRecord> {
    let window_start = now + Duration::hours(confirmation_hours_before - 1);
    let window_end = now + Duration::hours(confirmation_hours_before);

    let appointments = salon_db::appointments::list_in_window(
        pool,
        window_start,
        window_end,
        &[AppointmentStatus::Pending],
    )
    .await?;

    let mut processed = 0u32;
    let mut errors = 0u32;

    for appointment in appointments {
        if appointment.confirmation_sent_at.is_some() {
            continue;
        }
        let Some(customer) = salon_db::customers::get_by_id(pool, &appointment.customer_id).await? else {
            warn!(appointment_id = %appointment.id, "customer vanished; skipping confirmation send");
            continue;
        };

        let mut params = HashMap::new();
        params.insert(1, customer.first_name.clone());
        params.insert(2, appointment.start_time.format("%d/%m %H:%M").to_string());

        match gateway
            .send_template_message(customer.phone.as_str(), "confirmacion_cita", &params, None)
            .await
        {
            Ok(_) => {
                salon_db::appointments::mark_confirmation_sent(pool, &appointment.id).await?;
                notify_admin(
                    pool,
                    "confirmation_sent",
                    "Confirmación enviada",
                    &format!(
                        "Se envió la solicitud de confirmación a {} para la cita del {}.",
                        customer.first_name,
                        appointment.start_time.format("%d/%m %H:%M")
                    ),
                    appointment.id.as_str(),
                )
                .await;
                processed += 1;
            }
            Err(e) => {
                error!(appointment_id = %appointment.id, error = %e, "confirmation send failed");
                errors += 1;
            }
        }
    }

    Ok(HealthRecord::new(JobName::SendConfirmations, now, processed, errors))
}

/// Cancel PENDING appointments whose confirmation was sent more than
/// `auto_cancel_hours_before` hours ago and which start within the next 24h,
/// i.e. the customer never replied in time.
#[instrument(skip(pool, gateway, calendar))]
pub async fn auto_cancel(
    pool: &SqlitePool,
    gateway: &dyn MessagingGateway,
    calendar: &dyn CalendarClient,
    auto_cancel_hours_before: i64,
    now: DateTime<Utc>,
) -> Result<HealthRecord> {
    let window_start = now;
    let window_end = now + Duration::hours(24);
    let sent_cutoff = now - Duration::hours(auto_cancel_hours_before);

    let appointments = salon_db::appointments::list_in_window(
        pool,
        window_start,
        window_end,
        &[AppointmentStatus::Pending],
    )
    .await?;

    let mut processed = 0u32;
    let mut errors = 0u32;

    for appointment in appointments {
        let Some(sent_at) = appointment.confirmation_sent_at else {
            continue;
        };
        if sent_at > sent_cutoff {
            continue;
        }

        match salon_db::appointments::set_status(pool, &appointment.id, AppointmentStatus::Cancelled).await {
            Ok(()) => {
                processed += 1;

                if let Some(event_id) = &appointment.calendar_event_id {
                    if let Ok(Some(stylist)) = salon_db::stylists::get_by_id(pool, &appointment.stylist_id).await {
                        if let Err(e) = calendar.delete_event(&stylist.calendar_id, event_id).await {
                            warn!(appointment_id = %appointment.id, error = %e, "calendar event deletion failed on auto-cancel");
                        }
                    }
                }

                if let Ok(Some(customer)) = salon_db::customers::get_by_id(pool, &appointment.customer_id).await {
                    let mut params = HashMap::new();
                    params.insert(1, appointment.start_time.format("%d/%m %H:%M").to_string());
                    if let Err(e) = gateway
                        .send_template_message(customer.phone.as_str(), "cancelacion_automatica", &params, None)
                        .await
                    {
                        warn!(appointment_id = %appointment.id, error = %e, "auto-cancel notice failed");
                    }

                    notify_admin(
                        pool,
                        "auto_cancelled",
                        "Cita cancelada automáticamente",
                        &format!(
                            "La cita de {} del {} se canceló automáticamente por falta de confirmación.",
                            customer.first_name,
                            appointment.start_time.format("%d/%m %H:%M")
                        ),
                        appointment.id.as_str(),
                    )
                    .await;
                }
            }
            Err(e) => {
                error!(appointment_id = %appointment.id, error = %e, "auto-cancel failed");
                errors += 1;
            }
        }
    }

    Ok(HealthRecord::new(JobName::AutoCancel, now, processed, errors))
}

/// Send the pre-appointment reminder for every CONFIRMED appointment
/// starting between `reminder_hours_before` and `reminder_hours_before - 1`
/// hours from now (§4.13 job 3).
#[instrument(skip(pool, gateway))]
pub async fn send_reminders(
    pool: &SqlitePool,
    gateway: &dyn MessagingGateway,
    reminder_hours_before: i64,
    now: DateTime<Utc>,
) -> Result<HealthRecord> {
    let window_start = now + Duration::hours(reminder_hours_before - 1);
    let window_end = now + Duration::hours(reminder_hours_before);

    let appointments = salon_db::appointments::list_in_window(
        pool,
        window_start,
        window_end,
        &[AppointmentStatus::Confirmed],
    )
    .await?;

    let mut processed = 0u32;
    let mut errors = 0u32;

    for appointment in appointments {
        if appointment.reminder_sent_at.is_some() {
            continue;
        }
        let Some(customer) = salon_db::customers::get_by_id(pool, &appointment.customer_id).await? else {
            warn!(appointment_id = %appointment.id, "customer vanished; skipping reminder send");
            continue;
        };

        let text = format!(
            "Te recordamos tu cita de hoy a las {}. ¡Te esperamos!",
            appointment.start_time.format("%H:%M")
        );

        match gateway.send_message(customer.phone.as_str(), &text, None).await {
            Ok(_) => {
                salon_db::appointments::mark_reminder_sent(pool, &appointment.id).await?;
                processed += 1;
            }
            Err(e) => {
                error!(appointment_id = %appointment.id, error = %e, "reminder send failed");
                errors += 1;
            }
        }
    }

    Ok(HealthRecord::new(JobName::SendReminders, now, processed, errors))
}
