use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the classifier (C3) can hand back to the FSM for a single
/// turn. One variant per distinguishable user move across the booking flow,
/// general chit-chat, confirmation/decline, and cancellation sub-flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentType {
    // Booking flow
    StartBooking,
    SelectService,
    ConfirmServices,
    SelectStylist,
    SelectSlot,
    ConfirmStylistChange,
    ProvideCustomerData,
    UseCustomerName,
    ProvideThirdPartyBooking,
    ConfirmName,
    CorrectName,
    ConfirmBooking,
    CancelBooking,

    // General
    Greeting,
    Faq,
    CheckAvailability,
    Escalate,
    UpdateName,
    Unknown,

    // Confirmation (post-booking)
    ConfirmAppointment,
    DeclineAppointment,

    // Cancellation sub-flow
    InitiateCancellation,
    SelectCancellation,
    ConfirmCancellation,
    AbortCancellation,
    InsistCancellation,

    // Decline double-confirm
    ConfirmDecline,
    AbortDecline,

    CheckMyAppointments,
}

impl IntentType {
    /// Intents that append to `collected_data` instead of requiring a full
    /// re-validation of the existing slot (used by `BookingFsm::transition`'s
    /// merge step).
    pub fn accumulates_data(self) -> bool {
        matches!(
            self,
            IntentType::SelectService
                | IntentType::ProvideCustomerData
                | IntentType::ProvideThirdPartyBooking
        )
    }
}

/// A single classified turn: intent plus loosely-typed entities extracted
/// by the LLM (raw strings/numbers/bools, resolved against the domain
/// catalog downstream by the Service Resolver and Slot Validator, not here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,
    pub confidence: f32,
    pub raw_message: String,
    #[serde(default)]
    pub requires_tool: bool,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub service_query: Option<String>,
}

impl Intent {
    pub fn entity_str(&self, key: &str) -> Option<&str> {
        self.entities.get(key).and_then(|v| v.as_str())
    }

    pub fn entity_bool(&self, key: &str) -> Option<bool> {
        self.entities.get(key).and_then(|v| v.as_bool())
    }
}
