use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Message window size — at most this many recent messages are kept in the
/// active checkpoint (§3.1).
pub const MESSAGE_WINDOW: usize = 10;
/// Classifier confidence threshold (τ) — below this, intent is forced to
/// `UNKNOWN` (§3.3).
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Consecutive-failure threshold that triggers auto-escalation (§4.1 step 1).
pub const AUTO_ESCALATION_THRESHOLD: u32 = 3;
/// Minimum lead time for a bookable slot, in calendar days (§4.4, §9 Open
/// Question #1 — truncating calendar-day difference, not a 72h duration).
pub const MIN_LEAD_DAYS: i64 = 3;
/// Stylist-context cache TTL (§5, SPEC_FULL.md §11).
pub const STYLIST_CACHE_TTL_SECS: u64 = 600;
/// Default checkpoint TTL — 1 hour of inactivity (§4.11).
pub const CHECKPOINT_TTL_SECS: u64 = 3600;
/// Rate limit: requests per minute per IP (§5).
pub const RATE_LIMIT_PER_MINUTE: u32 = 10;

/// Top-level configuration. Every field name matches the literal (unprefixed)
/// environment variable it is a contract with (§6.7) — these names belong to
/// other systems and must not be renamed or nested under a prefix the way
/// this project's own tunables are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalonConfig {
    pub database_url: String,
    pub redis_url: String,
    pub chatwoot_api_url: String,
    pub chatwoot_api_token: String,
    pub chatwoot_account_id: String,
    pub chatwoot_inbox_id: String,
    pub chatwoot_webhook_token: Option<String>,
    pub openrouter_api_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    pub google_service_account_json: String,
    pub google_calendar_ids: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    /// Scheduler tunables — also named literally in §6.7, not `SALON_`-prefixed.
    #[serde(default = "default_confirmation_hours")]
    pub confirmation_hours_before: i64,
    #[serde(default = "default_auto_cancel_hours")]
    pub auto_cancel_hours_before: i64,
    #[serde(default = "default_reminder_hours")]
    pub reminder_hours_before: i64,
}

fn default_confirmation_hours() -> i64 {
    48
}
fn default_auto_cancel_hours() -> i64 {
    24
}
fn default_reminder_hours() -> i64 {
    2
}
fn default_timezone() -> String {
    "Europe/Madrid".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_llm_model() -> String {
    "anthropic/claude-sonnet-4.6".to_string()
}

/// Every top-level env var this config reads, spelled exactly as in §6.7 —
/// matched case-insensitively against struct field names by `Env::raw()`.
const EXTERNAL_ENV_VARS: &[&str] = &[
    "DATABASE_URL",
    "REDIS_URL",
    "CHATWOOT_API_URL",
    "CHATWOOT_API_TOKEN",
    "CHATWOOT_ACCOUNT_ID",
    "CHATWOOT_INBOX_ID",
    "CHATWOOT_WEBHOOK_TOKEN",
    "OPENROUTER_API_KEY",
    "LLM_MODEL",
    "GOOGLE_SERVICE_ACCOUNT_JSON",
    "GOOGLE_CALENDAR_IDS",
    "TIMEZONE",
    "LOG_LEVEL",
    "SITE_URL",
    "SITE_NAME",
    "CONFIRMATION_HOURS_BEFORE",
    "AUTO_CANCEL_HOURS_BEFORE",
    "REMINDER_HOURS_BEFORE",
];

impl SalonConfig {
    /// Load config from an optional TOML file, overridden by the literal
    /// (unprefixed) environment variables named in §6.7. There is no
    /// internal `SALON_`-prefixed tier: every recognised variable is an
    /// external contract with a fixed, flat name, so the whole struct is
    /// flat to match.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `SALON_CONFIG` env var
    ///   3. `./salon.toml`
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("SALON_CONFIG").ok())
            .unwrap_or_else(|| "salon.toml".to_string());

        let config: SalonConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::raw().only(EXTERNAL_ENV_VARS))
            .extract()
            .map_err(|e| crate::error::SalonError::Config(e.to_string()))?;

        Ok(config)
    }
}
