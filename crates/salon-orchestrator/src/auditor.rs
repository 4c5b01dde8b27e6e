//! State-action audit (spec.md §4.1 step 8, §8): a last line of defence
//! against a reply that claims to have booked an appointment when the
//! `book` tool was never actually invoked this turn, and against the FSM
//! reaching `BOOKED` without the persisted `appointment_created` flag to
//! back it up.

use salon_fsm::BookingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    Critical,
}

#[derive(Debug, Clone)]
pub struct AuditResult {
    pub coherent: bool,
    pub severity: Severity,
    pub reason: Option<String>,
}

impl AuditResult {
    fn coherent() -> Self {
        Self {
            coherent: true,
            severity: Severity::None,
            reason: None,
        }
    }

    fn critical(reason: impl Into<String>) -> Self {
        Self {
            coherent: false,
            severity: Severity::Critical,
            reason: Some(reason.into()),
        }
    }
}

/// A reply confirming a booking in the customer's own language, without the
/// conditional/future framing ("voy a reservar") that is fine to say before
/// `book` has actually run.
const CONFIRMATION_PHRASE: &str = r"(?i)(ya he|he|hemos)\s+(reservado|agendado|creado|confirmado)\s+(tu|su|la)\s+cita";

fn confirmation_phrase_re() -> regex::Regex {
    regex::Regex::new(CONFIRMATION_PHRASE).expect("static pattern is valid")
}

/// Scans the reply text the customer is about to receive against the two
/// coherence properties in §8: no hallucinated confirmation, and `BOOKED`
/// always implies `appointment_created`.
pub fn audit(
    reply_text: &str,
    book_invoked_this_turn: bool,
    fsm_state: BookingState,
    appointment_created: bool,
) -> AuditResult {
    if !book_invoked_this_turn && confirmation_phrase_re().is_match(reply_text) {
        return AuditResult::critical(
            "reply claims the appointment is booked but the book tool was not invoked this turn",
        );
    }
    if fsm_state == BookingState::Booked && !appointment_created {
        return AuditResult::critical("fsm reached BOOKED without appointment_created being set");
    }
    AuditResult::coherent()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_hallucinated_confirmation() {
        let result = audit("Ya he reservado tu cita para el jueves.", false, BookingState::Confirmation, false);
        assert!(!result.coherent);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn accepts_confirmation_when_book_ran() {
        let result = audit("Hemos confirmado tu cita, ¡te esperamos!", true, BookingState::Booked, true);
        assert!(result.coherent);
    }

    #[test]
    fn allows_future_tense_phrasing() {
        let result = audit("Voy a reservar tu cita en un momento.", false, BookingState::Confirmation, false);
        assert!(result.coherent);
    }

    #[test]
    fn flags_booked_state_without_appointment_created() {
        let result = audit("Un placer ayudarte.", false, BookingState::Booked, false);
        assert!(!result.coherent);
    }
}
