//! State-aware prompt assembly for the classifier (§4.3). The prompt never
//! carries full collected-data values — only which fields are already
//! populated — so the model's entity extraction is not biased by its own
//! prior guesses.

use salon_fsm::{BookingState, CollectedData, IntentType};

const INTENT_DEFINITIONS: &str = r#"
START_BOOKING: the customer wants to book an appointment.
SELECT_SERVICE: naming one or more services to add to the booking.
CONFIRM_SERVICES: confirming the service list is complete, ready to pick a stylist.
SELECT_STYLIST: naming or picking a stylist.
CHECK_AVAILABILITY: asking what's free on a given day.
SELECT_SLOT: picking one of the offered time slots.
CONFIRM_STYLIST_CHANGE: agreeing to switch stylist for a slot that belongs to someone else.
PROVIDE_CUSTOMER_DATA: giving a name and/or notes for the booking.
USE_CUSTOMER_NAME: asking to book under the name already on file.
PROVIDE_THIRD_PARTY_BOOKING: booking for someone other than the message sender.
CONFIRM_NAME: confirming the name on file is correct.
CORRECT_NAME: supplying a corrected name.
CONFIRM_BOOKING: final yes to commit the appointment.
CANCEL_BOOKING: abandoning the booking flow in progress.
GREETING: a hello with no other intent.
FAQ: a question about hours, location, prices, policies.
ESCALATE: asking for a human.
UPDATE_NAME: asking to change the name on file, outside a booking flow.
CONFIRM_APPOINTMENT: saying yes to a pending confirmation request.
DECLINE_APPOINTMENT: saying no to a pending confirmation request.
INITIATE_CANCELLATION: asking to cancel an existing appointment.
SELECT_CANCELLATION: picking which existing appointment to cancel.
CONFIRM_CANCELLATION: confirming the cancellation.
ABORT_CANCELLATION: backing out of the cancellation.
INSIST_CANCELLATION: insisting on cancelling after being asked to reconsider.
CONFIRM_DECLINE: confirming a decline that requires a second confirmation.
ABORT_DECLINE: backing out of a decline.
CHECK_MY_APPOINTMENTS: asking what appointments the customer currently has.
UNKNOWN: none of the above, or unclear.
"#;

fn populated_fields(data: &CollectedData) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if !data.services.is_empty() {
        fields.push("services");
    }
    if data.stylist_id.is_some() {
        fields.push("stylist_id");
    }
    if data.slot.is_some() {
        fields.push("slot");
    }
    if data.customer_name.is_some() {
        fields.push("customer_name");
    }
    if data.notes.is_some() {
        fields.push("notes");
    }
    if data.name_confirmed {
        fields.push("name_confirmed");
    }
    fields
}

/// "1" means something different depending on which list was last shown
/// (§4.3 "state-aware disambiguation").
fn disambiguation_hint(state: BookingState) -> &'static str {
    match state {
        BookingState::ServiceSelection => {
            "If the customer replies with a bare number like \"1\", it means \"select service #1\" from the list just shown."
        }
        BookingState::StylistSelection => {
            "If the customer replies with a bare number like \"1\", it means \"select stylist #1\" from the list just shown."
        }
        BookingState::SlotSelection => {
            "If the customer replies with a bare number like \"1\", it means \"select slot #1\" from the list just shown."
        }
        _ => "",
    }
}

pub struct HistoryTurn<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Builds `(system, user)` for the classifier call.
pub fn build(
    state: BookingState,
    allowed_intents: &[IntentType],
    data: &CollectedData,
    history: &[HistoryTurn<'_>],
    message: &str,
) -> (String, String) {
    let allowed: Vec<String> = allowed_intents
        .iter()
        .filter_map(|i| serde_json::to_value(i).ok())
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let system = format!(
        "You are the intent classifier for a hair salon's WhatsApp booking assistant. \
         The conversation is currently in state {state}. The only intents valid from this \
         state are: {allowed:?}. Known intent definitions:\n{INTENT_DEFINITIONS}\n\
         {hint}\n\
         Fields already collected for this booking: {fields:?} (values withheld; only \
         presence matters).\n\
         Respond with a single JSON object: \
         {{\"intent_type\": \"ONE_OF_THE_ALLOWED_INTENTS\", \"entities\": {{...}}, \
         \"confidence\": 0.0-1.0, \"service_query\": \"...\" (optional)}}. \
         No prose, no markdown fence required but tolerated.",
        state = state,
        allowed = allowed,
        hint = disambiguation_hint(state),
        fields = populated_fields(data),
    );

    let mut user = String::new();
    for turn in history {
        user.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    user.push_str(&format!("user: {message}"));

    (system, user)
}
