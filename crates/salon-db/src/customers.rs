use salon_core::domain::Customer;
use salon_core::types::CustomerId;
use sqlx::{FromRow, SqlitePool};
use tracing::instrument;

#[derive(FromRow)]
struct CustomerRow {
    id: String,
    phone: String,
    first_name: String,
    last_name: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer {
            id: CustomerId(r.id),
            phone: r.phone,
            first_name: r.first_name,
            last_name: r.last_name,
        }
    }
}

#[instrument(skip(pool))]
pub async fn get_by_id(pool: &SqlitePool, id: &CustomerId) -> salon_core::Result<Option<Customer>> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, phone, first_name, last_name FROM customers WHERE id = ?1",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(row.map(Customer::from))
}

#[instrument(skip(pool))]
pub async fn get_by_phone(pool: &SqlitePool, phone: &str) -> salon_core::Result<Option<Customer>> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, phone, first_name, last_name FROM customers WHERE phone = ?1",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(row.map(Customer::from))
}

/// Upsert by phone (the entity's natural key, §3.5). Returns the resolved
/// customer, whether newly inserted or pre-existing.
///
/// Mirrors `manage_customer`'s `create_or_update` action (§4.6): an existing
/// row keeps any field not explicitly supplied in `first_name`/`last_name`
/// overrides — callers pass `None` to mean "leave unchanged".
#[instrument(skip(pool))]
pub async fn upsert_by_phone(
    pool: &SqlitePool,
    phone: &str,
    first_name: &str,
    last_name: Option<&str>,
) -> salon_core::Result<Customer> {
    if let Some(existing) = get_by_phone(pool, phone).await? {
        sqlx::query(
            "UPDATE customers SET first_name = ?1, last_name = COALESCE(?2, last_name) WHERE id = ?3",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(existing.id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

        return get_by_id(pool, &existing.id)
            .await?
            .ok_or_else(|| salon_core::SalonError::Internal("customer vanished after update".into()));
    }

    let id = CustomerId::new();
    sqlx::query(
        "INSERT INTO customers (id, phone, first_name, last_name) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id.as_str())
    .bind(phone)
    .bind(first_name)
    .bind(last_name)
    .execute(pool)
    .await
    .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;

    Ok(Customer {
        id,
        phone: phone.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.map(str::to_string),
    })
}

/// Update the customer's name in place (`UPDATE_NAME` non-booking intent,
/// §4.10).
#[instrument(skip(pool))]
pub async fn update_name(
    pool: &SqlitePool,
    id: &CustomerId,
    first_name: &str,
    last_name: Option<&str>,
) -> salon_core::Result<()> {
    sqlx::query("UPDATE customers SET first_name = ?1, last_name = ?2 WHERE id = ?3")
        .bind(first_name)
        .bind(last_name)
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| salon_core::SalonError::Database(e.to_string()))?;
    Ok(())
}
