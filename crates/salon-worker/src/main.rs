use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use salon_channels::{
    CalendarClient, ChatwootConfig, ChatwootGateway, GoogleCalendarClient, GoogleCalendarConfig,
    MessagingGateway,
};
use salon_intent::{OpenRouterClient, OpenRouterConfig};
use salon_orchestrator::Orchestrator;
use salon_scheduler::SchedulerEngine;
use salon_state::{CheckpointStore, PubSubClient};
use salon_tools::{StylistCache, ToolContext};
use salon_validate::SlotValidator;
use tokio::sync::watch;
use tracing::info;

mod app;
mod http;
mod workers;

const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("SALON_CONFIG").ok();
    let config = salon_core::config::SalonConfig::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("salon_worker={},tower_http=info", config.log_level).into()),
        )
        .init();

    let pool = salon_db::connect(&config.database_url).await?;
    let validator = Arc::new(SlotValidator::load(&pool, &config.timezone).await?);
    let stylist_cache = Arc::new(StylistCache::new());

    let calendar: Arc<dyn CalendarClient> = Arc::new(GoogleCalendarClient::new(GoogleCalendarConfig {
        api_url: GOOGLE_CALENDAR_API_URL.to_string(),
        // Exchanging the service-account JSON for a bearer token happens
        // outside this boundary — the calendar is an opaque RPC collaborator
        // (spec.md §1), and the client here only ever needs the token.
        api_token: config.google_service_account_json.clone(),
    })?);

    let messaging: Arc<dyn MessagingGateway> = Arc::new(ChatwootGateway::new(ChatwootConfig {
        api_url: config.chatwoot_api_url.clone(),
        api_token: config.chatwoot_api_token.clone(),
        account_id: config.chatwoot_account_id.clone(),
        inbox_id: config.chatwoot_inbox_id.clone(),
    })?);

    let llm = OpenRouterClient::new(OpenRouterConfig {
        api_key: config.openrouter_api_key.clone(),
        model: config.llm_model.clone(),
        base_url: None,
        site_url: config.site_url.clone(),
        site_name: config.site_name.clone(),
    })?;

    let tool_ctx = ToolContext {
        pool: pool.clone(),
        calendar: calendar.clone(),
        messaging: messaging.clone(),
        validator,
        stylist_cache,
        config: Arc::new(config.clone()),
    };

    let checkpoints = CheckpointStore::new(&config.redis_url)?;
    let redis_pool = checkpoints.pool();
    let pubsub = PubSubClient::new(&config.redis_url)?;
    let orchestrator = Arc::new(Orchestrator::new(checkpoints, llm, tool_ctx));

    let health_dir = PathBuf::from(
        std::env::var("SCHEDULER_HEALTH_DIR").unwrap_or_else(|_| "scheduler-health".to_string()),
    );
    let scheduler = SchedulerEngine::new(
        pool.clone(),
        messaging.clone(),
        calendar.clone(),
        health_dir,
        config.confirmation_hours_before,
        config.auto_cancel_hours_before,
        config.reminder_hours_before,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let inbound_handle = tokio::spawn(workers::run_inbound(
        pubsub.clone(),
        orchestrator.clone(),
        shutdown_rx.clone(),
    ));
    let outbound_handle = tokio::spawn(workers::run_outbound(
        pubsub.clone(),
        messaging.clone(),
        shutdown_rx.clone(),
    ));
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let state = Arc::new(app::AppState {
        orchestrator,
        db_pool: pool,
        redis_pool,
    });
    let router = app::build_router(state);

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    info!("salon-worker health endpoint listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown_tx))
        .await?;

    info!("waiting for in-flight turns to finish");
    let _ = tokio::join!(inbound_handle, outbound_handle, scheduler_handle);

    Ok(())
}

/// Resolves once SIGINT/SIGTERM arrives, broadcasting the stop flag every
/// worker and the scheduler poll on before returning (§4.12: "no new
/// messages are dequeued once the flag is set").
async fn wait_for_shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
