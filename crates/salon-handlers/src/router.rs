//! Intent Router (C8, spec.md §4.8): routes a classified intent to the
//! Booking Handler or the Non-Booking Handler. The split is total and
//! disjoint by construction — `is_booking_intent` is an exhaustive match,
//! so the compiler itself rejects an intent variant left uncovered.

use salon_fsm::IntentType;

/// `true` for the booking-flow intents the FSM's `transition` table
/// understands — the nine spec.md §4.8 names (`CHECK_AVAILABILITY` among
/// them, the `SLOT_SELECTION` self-loop) plus the sub-phase intents the
/// distilled list folds into `PROVIDE_CUSTOMER_DATA`/`SELECT_SLOT`'s
/// neighbourhood (`CONFIRM_STYLIST_CHANGE`, `USE_CUSTOMER_NAME`,
/// `PROVIDE_THIRD_PARTY_BOOKING`, `CONFIRM_NAME`, `CORRECT_NAME`); `false`
/// for everything else, including the §4.14 supplemental intents
/// (cancellation sub-flow, confirm/decline, `CHECK_MY_APPOINTMENTS`), which
/// never touch `BookingFsm::transition`.
pub fn is_booking_intent(intent: IntentType) -> bool {
    match intent {
        IntentType::StartBooking
        | IntentType::SelectService
        | IntentType::ConfirmServices
        | IntentType::SelectStylist
        | IntentType::CheckAvailability
        | IntentType::SelectSlot
        | IntentType::ConfirmStylistChange
        | IntentType::ProvideCustomerData
        | IntentType::UseCustomerName
        | IntentType::ProvideThirdPartyBooking
        | IntentType::ConfirmName
        | IntentType::CorrectName
        | IntentType::ConfirmBooking
        | IntentType::CancelBooking => true,

        IntentType::Greeting
        | IntentType::Faq
        | IntentType::Escalate
        | IntentType::UpdateName
        | IntentType::Unknown
        | IntentType::ConfirmAppointment
        | IntentType::DeclineAppointment
        | IntentType::InitiateCancellation
        | IntentType::SelectCancellation
        | IntentType::ConfirmCancellation
        | IntentType::AbortCancellation
        | IntentType::InsistCancellation
        | IntentType::ConfirmDecline
        | IntentType::AbortDecline
        | IntentType::CheckMyAppointments => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[IntentType] = &[
        IntentType::StartBooking,
        IntentType::SelectService,
        IntentType::ConfirmServices,
        IntentType::SelectStylist,
        IntentType::SelectSlot,
        IntentType::ConfirmStylistChange,
        IntentType::ProvideCustomerData,
        IntentType::UseCustomerName,
        IntentType::ProvideThirdPartyBooking,
        IntentType::ConfirmName,
        IntentType::CorrectName,
        IntentType::ConfirmBooking,
        IntentType::CancelBooking,
        IntentType::CheckAvailability,
        IntentType::Greeting,
        IntentType::Faq,
        IntentType::Escalate,
        IntentType::UpdateName,
        IntentType::Unknown,
        IntentType::ConfirmAppointment,
        IntentType::DeclineAppointment,
        IntentType::InitiateCancellation,
        IntentType::SelectCancellation,
        IntentType::ConfirmCancellation,
        IntentType::AbortCancellation,
        IntentType::InsistCancellation,
        IntentType::ConfirmDecline,
        IntentType::AbortDecline,
        IntentType::CheckMyAppointments,
    ];

    #[test]
    fn booking_set_matches_spec_count() {
        // The 9 intents spec.md §4.8 names plus the 5 CUSTOMER_DATA/
        // SLOT_SELECTION sub-phase intents the distilled list folds into
        // its neighbours (CONFIRM_STYLIST_CHANGE, USE_CUSTOMER_NAME,
        // PROVIDE_THIRD_PARTY_BOOKING, CONFIRM_NAME, CORRECT_NAME).
        let booking_count = ALL.iter().filter(|i| is_booking_intent(**i)).count();
        assert_eq!(booking_count, 14);
    }

    #[test]
    fn every_intent_is_classified_one_way() {
        // Coverage is enforced by the exhaustive match in `is_booking_intent`
        // itself (no wildcard arm); this just checks the full enum is
        // exercised here so a newly-added variant fails this test too.
        assert_eq!(ALL.len(), 29);
    }
}
