use chrono::NaiveDate;

use crate::error::Result;

const HOLIDAYS_POLICY_KEY: &str = "holidays";

/// Load the salon's holiday calendar, stored as a JSON array of `YYYY-MM-DD`
/// strings under the `holidays` policy key. An absent key means no holidays
/// are configured, not an error.
pub async fn load(pool: &sqlx::SqlitePool) -> Result<Vec<NaiveDate>> {
    let Some(policy) = salon_db::policies::get(pool, HOLIDAYS_POLICY_KEY).await? else {
        return Ok(Vec::new());
    };
    let Some(entries) = policy.value.as_array() else {
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .collect())
}
