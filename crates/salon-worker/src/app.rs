use std::sync::Arc;

use axum::{routing::get, Router};
use deadpool_redis::Pool as RedisPool;
use salon_orchestrator::Orchestrator;
use sqlx::SqlitePool;

/// Central shared state — passed as Arc<AppState> to the `/health` handler.
/// The two pub/sub worker loops and the scheduler hold their own handles
/// directly (see `main.rs`); this struct exists only for what Axum needs.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub db_pool: SqlitePool,
    pub redis_pool: RedisPool,
}

/// Assemble the full Axum router. `/health` is the only route this process
/// exposes — the messaging/payment webhook edge and the admin console are
/// both out of scope (spec.md §1).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
