use crate::action::ResponseGuidance;
use crate::data::CollectedData;
use crate::state::BookingState;

/// Static per-state baseline. `SERVICE_SELECTION`, `CUSTOMER_DATA`, and
/// `SLOT_SELECTION` are further narrowed below once the current
/// `CollectedData` sub-phase is known — a stylist-change confirmation
/// pending, a name awaiting confirmation, notes not yet asked, and so on.
fn default_guidance(state: BookingState) -> ResponseGuidance {
    match state {
        BookingState::Idle => ResponseGuidance {
            must_show: vec![],
            must_ask: vec!["what the customer wants to do".to_string()],
            forbidden: vec!["inventing services or prices".to_string()],
            context_hint: "opening turn, no booking in progress".to_string(),
            required_tool_call: None,
        },
        BookingState::ServiceSelection => ResponseGuidance {
            must_show: vec!["the service catalog or the selection so far".to_string()],
            must_ask: vec!["confirmation of the chosen services".to_string()],
            forbidden: vec!["proposing a stylist or slot before services are confirmed".to_string()],
            context_hint: "collecting requested services".to_string(),
            required_tool_call: Some("list_services".to_string()),
        },
        BookingState::StylistSelection => ResponseGuidance {
            must_show: vec!["stylists qualified for the confirmed services".to_string()],
            must_ask: vec!["which stylist the customer prefers".to_string()],
            forbidden: vec!["suggesting a slot before a stylist is chosen".to_string()],
            context_hint: "choosing a stylist".to_string(),
            required_tool_call: Some("list_available_stylists".to_string()),
        },
        BookingState::SlotSelection => ResponseGuidance {
            must_show: vec!["available slots for the chosen stylist".to_string()],
            must_ask: vec!["which slot the customer wants".to_string()],
            forbidden: vec!["accepting a slot less than three days out".to_string()],
            context_hint: "choosing a slot".to_string(),
            required_tool_call: Some("get_availability".to_string()),
        },
        BookingState::CustomerData => ResponseGuidance {
            must_show: vec![],
            must_ask: vec!["the customer's name for the booking".to_string()],
            forbidden: vec!["skipping name confirmation".to_string()],
            context_hint: "collecting customer data".to_string(),
            required_tool_call: None,
        },
        BookingState::Confirmation => ResponseGuidance {
            must_show: vec!["full booking summary: services, stylist, slot, customer name".to_string()],
            must_ask: vec!["final yes/no confirmation".to_string()],
            forbidden: vec!["booking without an explicit confirmation".to_string()],
            context_hint: "awaiting final confirmation".to_string(),
            required_tool_call: None,
        },
        BookingState::Booked => ResponseGuidance {
            must_show: vec!["the booked appointment details".to_string()],
            must_ask: vec![],
            forbidden: vec!["implying the appointment can still be changed freely".to_string()],
            context_hint: "booking complete".to_string(),
            required_tool_call: Some("book".to_string()),
        },
    }
}

/// Entry point used by `BookingFsm::get_response_guidance`. Overrides the
/// static baseline with whatever the current sub-phase narrows it to.
pub fn guidance_for(state: BookingState, data: &CollectedData) -> ResponseGuidance {
    let mut guidance = default_guidance(state);

    match state {
        BookingState::ServiceSelection if !data.services.is_empty() => {
            guidance.must_show = vec!["the services selected so far".to_string()];
            guidance.must_ask = vec!["whether to add more services or confirm".to_string()];
            guidance.required_tool_call = None;
        }
        BookingState::SlotSelection if data.has_pending_stylist_change() => {
            guidance.must_show = vec!["the stylist conflict for the chosen slot".to_string()];
            guidance.must_ask =
                vec!["whether to switch stylists or pick a different slot".to_string()];
            guidance.required_tool_call = None;
        }
        BookingState::CustomerData if data.customer_name.is_some() && !data.name_confirmed => {
            guidance.must_ask = vec!["confirmation of the name on file".to_string()];
        }
        BookingState::CustomerData if data.customer_name.is_some() && !data.notes_asked => {
            guidance.must_ask = vec!["optional notes for the stylist".to_string()];
        }
        _ => {}
    }

    guidance
}
