use salon_core::domain::{Service, ServiceCategory};
use salon_core::types::ServiceId;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

#[derive(FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    duration_minutes: i64,
    category: String,
    active: bool,
}

impl TryFrom<ServiceRow> for Service {
    type Error = salon_core::SalonError;

    fn try_from(r: ServiceRow) -> Result<Self, Self::Error> {
        Ok(Service {
            id: ServiceId(r.id),
            name: r.name,
            duration_minutes: r.duration_minutes as i32,
            category: ServiceCategory::from_str(&r.category)?,
            active: r.active,
        })
    }
}

/// All active services — the corpus the Service Resolver (§4.5) fuzzy-
/// matches against.
#[instrument(skip(pool))]
pub async fn list_active(pool: &SqlitePool) -> salon_core::Result<Vec<Service>> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, duration_minutes, category, active FROM services WHERE active = 1",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Service::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn list_active_by_category(
    pool: &SqlitePool,
    category: ServiceCategory,
) -> salon_core::Result<Vec<Service>> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, duration_minutes, category, active FROM services
         WHERE active = 1 AND category = ?1",
    )
    .bind(category.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Service::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_by_id(pool: &SqlitePool, id: &ServiceId) -> salon_core::Result<Option<Service>> {
    let row = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, duration_minutes, category, active FROM services WHERE id = ?1",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(Service::try_from).transpose()
}

#[instrument(skip(pool))]
pub async fn upsert(pool: &SqlitePool, service: &Service) -> salon_core::Result<()> {
    sqlx::query(
        "INSERT INTO services (id, name, duration_minutes, category, active)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             duration_minutes = excluded.duration_minutes,
             category = excluded.category,
             active = excluded.active",
    )
    .bind(service.id.as_str())
    .bind(&service.name)
    .bind(service.duration_minutes as i64)
    .bind(service.category.as_str())
    .bind(service.active)
    .execute(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(())
}
