use salon_core::domain::{ServiceCategory, Stylist};
use salon_core::types::StylistId;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

#[derive(FromRow)]
struct StylistRow {
    id: String,
    name: String,
    categories: String,
    calendar_id: String,
    active: bool,
}

impl TryFrom<StylistRow> for Stylist {
    type Error = salon_core::SalonError;

    fn try_from(r: StylistRow) -> Result<Self, Self::Error> {
        let categories = r
            .categories
            .split(',')
            .filter(|s| !s.is_empty())
            .map(ServiceCategory::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Stylist {
            id: StylistId(r.id),
            name: r.name,
            categories,
            calendar_id: r.calendar_id,
            active: r.active,
        })
    }
}

fn join_categories(categories: &[ServiceCategory]) -> String {
    categories
        .iter()
        .map(ServiceCategory::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[instrument(skip(pool))]
pub async fn get_by_id(pool: &SqlitePool, id: &StylistId) -> salon_core::Result<Option<Stylist>> {
    let row = sqlx::query_as::<_, StylistRow>(
        "SELECT id, name, categories, calendar_id, active FROM stylists WHERE id = ?1",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(Stylist::try_from).transpose()
}

/// Active stylists able to perform the given category (§4.6 `list_stylists`).
#[instrument(skip(pool))]
pub async fn list_active_by_category(
    pool: &SqlitePool,
    category: ServiceCategory,
) -> salon_core::Result<Vec<Stylist>> {
    let rows = sqlx::query_as::<_, StylistRow>(
        "SELECT id, name, categories, calendar_id, active FROM stylists
         WHERE active = 1 AND (',' || categories || ',') LIKE '%,' || ?1 || ',%'",
    )
    .bind(category.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Stylist::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn upsert(pool: &SqlitePool, stylist: &Stylist) -> salon_core::Result<()> {
    sqlx::query(
        "INSERT INTO stylists (id, name, categories, calendar_id, active)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             categories = excluded.categories,
             calendar_id = excluded.calendar_id,
             active = excluded.active",
    )
    .bind(stylist.id.as_str())
    .bind(&stylist.name)
    .bind(join_categories(&stylist.categories))
    .bind(&stylist.calendar_id)
    .bind(stylist.active)
    .execute(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(())
}
