use chrono::Utc;
use salon_core::domain::Notification;
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

/// Insert an admin-panel notification record. Fire-and-forget from the
/// caller's perspective (§4.6 `book`, §4.1 auto-escalation) — failures are
/// logged, not propagated, since a missing notification must never abort a
/// booking or escalation that already succeeded.
#[instrument(skip(pool))]
pub async fn create(pool: &SqlitePool, notification: &Notification) -> salon_core::Result<()> {
    sqlx::query(
        "INSERT INTO notifications (id, type, title, message, entity_type, entity_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(&notification.notification_type)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.entity_type)
    .bind(&notification.entity_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(())
}
