use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health (§6.8) — 200 with `{status, redis, postgres}` when both the
/// checkpoint store and the relational store answer, 503 otherwise.
///
/// The `postgres` field name is the external contract's literal spelling;
/// the relational store behind it is sqlite (§6.5), matching the config
/// layer's convention of keeping other systems' names unrenamed.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let redis_ok = ping_redis(&state).await;
    let postgres_ok = ping_db(&state).await;

    let status = if redis_ok && postgres_ok { "ok" } else { "degraded" };
    let code = if redis_ok && postgres_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "redis": redis_ok,
            "postgres": postgres_ok,
        })),
    )
}

async fn ping_redis(state: &AppState) -> bool {
    let Ok(mut conn) = state.redis_pool.get().await else {
        return false;
    };
    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .is_ok()
}

async fn ping_db(state: &AppState) -> bool {
    sqlx::query("SELECT 1")
        .execute(&state.db_pool)
        .await
        .is_ok()
}
