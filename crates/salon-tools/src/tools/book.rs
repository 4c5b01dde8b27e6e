use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use salon_channels::NewEvent;
use salon_core::domain::Notification;
use salon_core::types::{ServiceId, StylistId};

use crate::context::ToolContext;
use crate::error::{Result, ToolError};

fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs(format!("book requires a \"{field}\" string")))
}

/// `book` (§4.6): the only mutating tool in the booking flow. Re-validates
/// the slot, re-checks calendar availability, commits the appointment
/// transactionally, then creates the calendar event and admin notification.
/// A `BookingConflict` here means a concurrent customer took the slot first
/// (§7 category 5) — the caller is expected to send the customer back to
/// slot selection, not retry automatically.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let phone = require_str(args, "phone")?;
    let first_name = require_str(args, "first_name")?;
    let last_name = args.get("last_name").and_then(Value::as_str);
    let stylist_id_str = require_str(args, "stylist_id")?;
    let start_time_str = require_str(args, "start_time")?;

    let service_ids: Vec<ServiceId> = args
        .get("service_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::InvalidArgs("book requires a \"service_ids\" array".into()))?
        .iter()
        .filter_map(Value::as_str)
        .map(ServiceId::from)
        .collect();
    if service_ids.is_empty() {
        return Err(ToolError::InvalidArgs("book requires at least one service id".into()));
    }

    let duration_minutes = args
        .get("duration_minutes")
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidArgs("book requires a \"duration_minutes\" integer".into()))?
        as i32;

    let validation = ctx.validator.validate(start_time_str, Some(duration_minutes as i64), Utc::now());
    if !validation.valid {
        return Err(ToolError::InvalidArgs(
            validation.error_message.unwrap_or_else(|| "invalid slot".to_string()),
        ));
    }
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(start_time_str)
        .expect("validator already confirmed this parses")
        .with_timezone(&Utc);

    let customer = salon_db::customers::upsert_by_phone(&ctx.pool, phone, first_name, last_name).await?;
    let stylist_id = StylistId::from(stylist_id_str);

    let appointment = salon_db::appointments::insert_checked(
        &ctx.pool,
        &customer.id,
        &stylist_id,
        &service_ids,
        start,
        duration_minutes,
    )
    .await?;

    let calendar_id = match salon_db::stylists::get_by_id(&ctx.pool, &stylist_id).await? {
        Some(stylist) => stylist.calendar_id,
        None => {
            tracing::warn!(stylist_id = stylist_id.as_str(), "booked stylist missing from directory");
            String::new()
        }
    };

    if !calendar_id.is_empty() {
        let event = NewEvent {
            start,
            end: start + chrono::Duration::minutes(duration_minutes as i64),
            summary: format!("{first_name} — {}", service_ids.iter().map(ServiceId::as_str).collect::<Vec<_>>().join(", ")),
            description: format!("Booked via WhatsApp assistant. Phone: {phone}"),
            color: None,
        };
        match ctx.calendar.create_event(&calendar_id, &event).await {
            Ok(created) => {
                if let Err(e) = salon_db::appointments::set_calendar_event_id(&ctx.pool, &appointment.id, &created.id).await {
                    tracing::warn!(error = %e, appointment_id = appointment.id.as_str(), "failed to persist calendar event id");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, appointment_id = appointment.id.as_str(), "failed to create calendar event for booking");
            }
        }
    }

    let notification = Notification {
        notification_type: "new_booking".to_string(),
        title: "New appointment booked".to_string(),
        message: format!("{first_name} booked for {start}"),
        entity_type: "appointment".to_string(),
        entity_id: appointment.id.as_str().to_string(),
    };
    if let Err(e) = salon_db::notifications::create(&ctx.pool, &notification).await {
        tracing::warn!(error = %e, "failed to record booking notification");
    }

    Ok(json!({
        "appointment_id": appointment.id.as_str(),
        "customer_id": customer.id.as_str(),
        "start_time": appointment.start_time.to_rfc3339(),
        "duration_minutes": appointment.duration_minutes,
    }))
}
