use salon_core::domain::Policy;
use sqlx::{FromRow, SqlitePool};
use tracing::instrument;

#[derive(FromRow)]
struct PolicyRow {
    key: String,
    value: String,
}

impl TryFrom<PolicyRow> for Policy {
    type Error = salon_core::SalonError;

    fn try_from(r: PolicyRow) -> Result<Self, Self::Error> {
        Ok(Policy {
            key: r.key,
            value: serde_json::from_str(&r.value)?,
        })
    }
}

#[instrument(skip(pool))]
pub async fn get(pool: &SqlitePool, key: &str) -> salon_core::Result<Option<Policy>> {
    let row = sqlx::query_as::<_, PolicyRow>("SELECT key, value FROM policies WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    row.map(Policy::try_from).transpose()
}

/// All entries whose key starts with `faq_` — the non-booking handler's FAQ
/// corpus (§4.10).
#[instrument(skip(pool))]
pub async fn list_faqs(pool: &SqlitePool) -> salon_core::Result<Vec<Policy>> {
    let rows = sqlx::query_as::<_, PolicyRow>(
        "SELECT key, value FROM policies WHERE key LIKE 'faq\\_%' ESCAPE '\\' ORDER BY key",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    rows.into_iter().map(Policy::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn set(pool: &SqlitePool, key: &str, value: &serde_json::Value) -> salon_core::Result<()> {
    let serialized = serde_json::to_string(value)?;
    sqlx::query(
        "INSERT INTO policies (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(serialized)
    .execute(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(())
}
