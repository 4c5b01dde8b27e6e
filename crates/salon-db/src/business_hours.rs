use chrono::NaiveTime;
use salon_core::domain::BusinessHours;
use sqlx::{FromRow, SqlitePool};
use tracing::instrument;

#[derive(FromRow)]
struct BusinessHoursRow {
    day_of_week: i64,
    start: String,
    end: String,
    closed: bool,
}

impl TryFrom<BusinessHoursRow> for BusinessHours {
    type Error = salon_core::SalonError;

    fn try_from(r: BusinessHoursRow) -> Result<Self, Self::Error> {
        Ok(BusinessHours {
            day_of_week: r.day_of_week as u8,
            start: parse_time(&r.start)?,
            end: parse_time(&r.end)?,
            closed: r.closed,
        })
    }
}

fn parse_time(s: &str) -> salon_core::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| salon_core::SalonError::Internal(format!("bad business hours time {s}: {e}")))
}

/// The full weekly schedule, one row per weekday (§4.4 policy layer,
/// §4.6 availability slot math).
#[instrument(skip(pool))]
pub async fn list_all(pool: &SqlitePool) -> salon_core::Result<Vec<BusinessHours>> {
    let rows = sqlx::query_as::<_, BusinessHoursRow>(
        "SELECT day_of_week, start, end, closed FROM business_hours ORDER BY day_of_week",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(BusinessHours::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_for_day(
    pool: &SqlitePool,
    day_of_week: u8,
) -> salon_core::Result<Option<BusinessHours>> {
    let row = sqlx::query_as::<_, BusinessHoursRow>(
        "SELECT day_of_week, start, end, closed FROM business_hours WHERE day_of_week = ?1",
    )
    .bind(day_of_week as i64)
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(BusinessHours::try_from).transpose()
}
