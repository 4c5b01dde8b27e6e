use sqlx::SqlitePool;

/// Initialise the full entity schema (§3.5). Idempotent — uses
/// `IF NOT EXISTS` throughout, safe to call on every startup.
pub async fn init_db(pool: &SqlitePool) -> salon_core::Result<()> {
    for stmt in STATEMENTS {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    }
    Ok(())
}

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (
        id         TEXT NOT NULL PRIMARY KEY,
        phone      TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name  TEXT
    ) STRICT",
    "CREATE TABLE IF NOT EXISTS stylists (
        id          TEXT NOT NULL PRIMARY KEY,
        name        TEXT NOT NULL,
        categories  TEXT NOT NULL,
        calendar_id TEXT NOT NULL,
        active      INTEGER NOT NULL DEFAULT 1
    ) STRICT",
    "CREATE TABLE IF NOT EXISTS services (
        id               TEXT NOT NULL PRIMARY KEY,
        name             TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL,
        category         TEXT NOT NULL,
        active           INTEGER NOT NULL DEFAULT 1
    ) STRICT",
    "CREATE INDEX IF NOT EXISTS idx_services_category ON services(category, active)",
    "CREATE TABLE IF NOT EXISTS appointments (
        id                   TEXT NOT NULL PRIMARY KEY,
        customer_id          TEXT NOT NULL,
        stylist_id           TEXT NOT NULL,
        service_ids          TEXT NOT NULL,
        start_time           TEXT NOT NULL,
        duration_minutes     INTEGER NOT NULL,
        status               TEXT NOT NULL,
        confirmation_sent_at TEXT,
        reminder_sent_at     TEXT,
        cancelled_at         TEXT,
        calendar_event_id    TEXT
    ) STRICT",
    "CREATE INDEX IF NOT EXISTS idx_appointments_stylist_window
        ON appointments(stylist_id, start_time)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_customer
        ON appointments(customer_id, start_time)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_status_window
        ON appointments(status, start_time)",
    "CREATE TABLE IF NOT EXISTS business_hours (
        day_of_week INTEGER NOT NULL PRIMARY KEY,
        start       TEXT NOT NULL,
        end         TEXT NOT NULL,
        closed      INTEGER NOT NULL DEFAULT 0
    ) STRICT",
    "CREATE TABLE IF NOT EXISTS policies (
        key   TEXT NOT NULL PRIMARY KEY,
        value TEXT NOT NULL
    ) STRICT",
    "CREATE TABLE IF NOT EXISTS notifications (
        id          TEXT NOT NULL PRIMARY KEY,
        type        TEXT NOT NULL,
        title       TEXT NOT NULL,
        message     TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id   TEXT NOT NULL,
        created_at  TEXT NOT NULL
    ) STRICT",
    "CREATE INDEX IF NOT EXISTS idx_notifications_created
        ON notifications(created_at DESC)",
];
