use serde::{Deserialize, Serialize};

/// Position in the booking flow (C2's state set, §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Idle,
    ServiceSelection,
    StylistSelection,
    SlotSelection,
    CustomerData,
    Confirmation,
    Booked,
}

impl BookingState {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingState::Idle => "IDLE",
            BookingState::ServiceSelection => "SERVICE_SELECTION",
            BookingState::StylistSelection => "STYLIST_SELECTION",
            BookingState::SlotSelection => "SLOT_SELECTION",
            BookingState::CustomerData => "CUSTOMER_DATA",
            BookingState::Confirmation => "CONFIRMATION",
            BookingState::Booked => "BOOKED",
        }
    }
}

impl Default for BookingState {
    fn default() -> Self {
        BookingState::Idle
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
