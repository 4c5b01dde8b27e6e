use thiserror::Error;

/// §7 error taxonomy classification, by kind rather than by concrete type —
/// the orchestrator branches on this, not on the variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid FSM transition, missing required field, malformed slot,
    /// unknown service. Recovered locally; FSM state unchanged.
    Validation,
    /// LLM timeout, messaging/calendar 5xx, DB deadlock. Retried with
    /// backoff; counts against the relevant circuit breaker on exhaustion.
    TransientExternal,
    /// The relevant circuit breaker is open; fail fast.
    BreakerOpen,
    /// Invalid enum, misconfigured client, assertion violation. The turn is
    /// considered crashed.
    Configuration,
    /// A concurrent booking consumed the slot.
    BookingConflict,
}

#[derive(Debug, Error)]
pub enum SalonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fsm validation failed: {0}")]
    FsmValidation(String),

    #[error("slot invalid: {0}")]
    SlotInvalid(String),

    #[error("service not found: {query}")]
    ServiceNotFound { query: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("messaging gateway error: {0}")]
    Messaging(String),

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("circuit breaker open: {dependency}")]
    BreakerOpen { dependency: String },

    #[error("booking conflict: slot no longer available")]
    BookingConflict,

    #[error("template render failed: {0}")]
    Template(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl SalonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SalonError::FsmValidation(_)
            | SalonError::SlotInvalid(_)
            | SalonError::ServiceNotFound { .. } => ErrorKind::Validation,
            SalonError::Database(_)
            | SalonError::LlmProvider(_)
            | SalonError::Messaging(_)
            | SalonError::Calendar(_)
            | SalonError::Timeout { .. } => ErrorKind::TransientExternal,
            SalonError::BreakerOpen { .. } => ErrorKind::BreakerOpen,
            SalonError::BookingConflict => ErrorKind::BookingConflict,
            SalonError::Config(_)
            | SalonError::Template(_)
            | SalonError::Serialization(_)
            | SalonError::Io(_)
            | SalonError::Internal(_) => ErrorKind::Configuration,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SalonError::Config(_) => "CONFIG_ERROR",
            SalonError::FsmValidation(_) => "FSM_VALIDATION",
            SalonError::SlotInvalid(_) => "SLOT_INVALID",
            SalonError::ServiceNotFound { .. } => "SERVICE_NOT_FOUND",
            SalonError::Database(_) => "DATABASE_ERROR",
            SalonError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            SalonError::Messaging(_) => "MESSAGING_ERROR",
            SalonError::Calendar(_) => "CALENDAR_ERROR",
            SalonError::BreakerOpen { .. } => "BREAKER_OPEN",
            SalonError::BookingConflict => "BOOKING_CONFLICT",
            SalonError::Template(_) => "TEMPLATE_ERROR",
            SalonError::Serialization(_) => "SERIALIZATION_ERROR",
            SalonError::Io(_) => "IO_ERROR",
            SalonError::Timeout { .. } => "TIMEOUT",
            SalonError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SalonError>;
