use crate::intent::IntentType;
use crate::state::BookingState;

/// Intents a given state will accept, ignoring the `CANCEL_BOOKING` global
/// escape hatch (every state accepts it; handled as a special case in
/// `BookingFsm::transition` rather than listed here).
pub fn allowed_intents(state: BookingState) -> &'static [IntentType] {
    use IntentType::*;
    match state {
        BookingState::Idle => &[
            StartBooking,
            Greeting,
            Faq,
            Escalate,
            UpdateName,
            CheckMyAppointments,
            InitiateCancellation,
            Unknown,
        ],
        BookingState::ServiceSelection => {
            &[SelectService, ConfirmServices, Faq, Escalate, Unknown]
        }
        BookingState::StylistSelection => &[SelectStylist, Faq, Escalate, Unknown],
        BookingState::SlotSelection => {
            &[SelectSlot, ConfirmStylistChange, Faq, Escalate, Unknown]
        }
        BookingState::CustomerData => &[
            ProvideCustomerData,
            UseCustomerName,
            ProvideThirdPartyBooking,
            ConfirmName,
            CorrectName,
            Faq,
            Escalate,
            Unknown,
        ],
        BookingState::Confirmation => &[ConfirmBooking, Faq, Escalate, Unknown],
        BookingState::Booked => &[
            StartBooking,
            ConfirmAppointment,
            DeclineAppointment,
            ConfirmDecline,
            AbortDecline,
            InitiateCancellation,
            SelectCancellation,
            ConfirmCancellation,
            AbortCancellation,
            InsistCancellation,
            CheckMyAppointments,
            Faq,
            Escalate,
            Unknown,
        ],
    }
}

/// Whether `intent` is a legal move from `state`. `CANCEL_BOOKING` is legal
/// everywhere; every other intent must appear in that state's allow-list.
pub fn can_transition(state: BookingState, intent: IntentType) -> bool {
    intent == IntentType::CancelBooking || allowed_intents(state).contains(&intent)
}

/// Collected-data fields that must already be populated before `intent` is
/// accepted from `state` — the structural half of `_get_validation_errors`.
/// Returns a human-readable reason per missing field, empty when nothing is
/// missing.
pub fn missing_requirements(
    state: BookingState,
    intent: IntentType,
    data: &crate::data::CollectedData,
) -> Vec<String> {
    use IntentType::*;
    let mut errors = Vec::new();
    match (state, intent) {
        (BookingState::ServiceSelection, ConfirmServices) if data.services.is_empty() => {
            errors.push("no services selected yet".to_string());
        }
        (BookingState::StylistSelection, _) if data.services.is_empty() => {
            errors.push("cannot select a stylist before services are confirmed".to_string());
        }
        (BookingState::SlotSelection, SelectSlot) if data.stylist_id.is_none() => {
            errors.push("no stylist selected yet".to_string());
        }
        (BookingState::Confirmation, ConfirmBooking) if data.slot.is_none() => {
            errors.push("no slot selected yet".to_string());
        }
        (BookingState::Confirmation, ConfirmBooking) if !data.name_confirmed => {
            errors.push("customer name not confirmed yet".to_string());
        }
        _ => {}
    }
    errors
}
