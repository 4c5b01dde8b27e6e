use std::sync::Arc;

use salon_channels::{CalendarClient, MessagingGateway};
use salon_core::config::SalonConfig;
use salon_validate::SlotValidator;
use sqlx::SqlitePool;

use crate::cache::StylistCache;

/// Everything a tool needs to run, threaded through from the orchestrator.
/// Cheap to clone — every field is a pool handle or an `Arc`.
#[derive(Clone)]
pub struct ToolContext {
    pub pool: SqlitePool,
    pub calendar: Arc<dyn CalendarClient>,
    pub messaging: Arc<dyn MessagingGateway>,
    pub validator: Arc<SlotValidator>,
    pub stylist_cache: Arc<StylistCache>,
    pub config: Arc<SalonConfig>,
}
