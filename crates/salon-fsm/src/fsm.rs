//! `BookingFsm` — the stateful controller described in spec.md §4.2.
//!
//! Transition logic is split across sibling modules: [`crate::transitions`]
//! owns the allow-list and data-requirement checks, [`crate::data`] owns
//! entity merging, [`crate::templates`] and [`crate::guidance`] own the
//! per-state prescribed action and rewrite guidance. This module is the
//! glue: `transition()`, `required_action()`, `response_guidance()`, and
//! the checkpoint (de)serialization round-trip.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::action::{FsmAction, ResponseGuidance};
use crate::data::CollectedData;
use crate::intent::{Intent, IntentType};
use crate::state::BookingState;
use crate::transitions;

/// Outcome of a single `transition()` call — the Rust analogue of the
/// source's `FSMResult`, but without a tagged `next_action` string; callers
/// inspect `new_state`/`collected_data` directly.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub success: bool,
    pub new_state: BookingState,
    pub validation_errors: Vec<String>,
    /// Set when the slot just selected belongs to a different stylist than
    /// the one already chosen and `is_soonest_any` was set on the entity —
    /// the caller should ask for `CONFIRM_STYLIST_CHANGE` before proceeding
    /// (spec.md §4.2.2 step 4).
    pub awaiting_stylist_change_confirmation: bool,
}

impl TransitionOutcome {
    fn rejected(state: BookingState, errors: Vec<String>) -> Self {
        Self {
            success: false,
            new_state: state,
            validation_errors: errors,
            awaiting_stylist_change_confirmation: false,
        }
    }

    fn accepted(state: BookingState) -> Self {
        Self {
            success: true,
            new_state: state,
            validation_errors: Vec::new(),
            awaiting_stylist_change_confirmation: false,
        }
    }
}

/// Checkpointed FSM snapshot (§3.2): state tag, accumulated data, and the
/// timestamp of the last successful transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingFsm {
    state: BookingState,
    collected_data: CollectedData,
    last_updated: DateTime<Utc>,
}

impl Default for BookingFsm {
    fn default() -> Self {
        Self {
            state: BookingState::Idle,
            collected_data: CollectedData::default(),
            last_updated: Utc::now(),
        }
    }
}

/// JSON-safe wire shape for `to_dict`/`from_dict` (§4.2.4).
#[derive(Debug, Serialize, Deserialize)]
struct FsmSnapshot {
    state: BookingState,
    collected_data: CollectedData,
    last_updated: DateTime<Utc>,
}

impl BookingFsm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn collected_data(&self) -> &CollectedData {
        &self.collected_data
    }

    pub fn collected_data_mut(&mut self) -> &mut CollectedData {
        &mut self.collected_data
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// §4.2.4 `to_dict()` — a JSON-safe mapping, coercing identifiers and
    /// timestamps as the checkpoint format requires.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(FsmSnapshot {
            state: self.state,
            collected_data: self.collected_data.clone(),
            last_updated: self.last_updated,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    /// §4.2.4 `from_dict()` — on any missing or malformed field, fall back
    /// to `IDLE` with empty data, logging the reason rather than failing
    /// the turn (round-trip law: `fromDict(corrupt) = IDLE` with a warning).
    #[instrument(skip(value))]
    pub fn from_dict(value: &serde_json::Value) -> Self {
        match serde_json::from_value::<FsmSnapshot>(value.clone()) {
            Ok(snapshot) => Self {
                state: snapshot.state,
                collected_data: snapshot.collected_data,
                last_updated: snapshot.last_updated,
            },
            Err(e) => {
                warn!(error = %e, "fsm checkpoint malformed, falling back to IDLE");
                Self::default()
            }
        }
    }

    /// The slot-freshness correction run by the orchestrator on checkpoint
    /// load (§4.1 step 2, §4.2.4): drops the collected `slot` only when it
    /// is malformed or starts less than 3 days from now (or in the past),
    /// and only then, if the FSM had already advanced past slot selection on
    /// the strength of it, forces the state back to `SLOT_SELECTION` so the
    /// customer is asked to pick again. A no-op if no slot was ever
    /// collected, or the caller reports the slot as still fresh.
    ///
    /// `is_fresh` is computed by the caller (normally
    /// `SlotValidator::is_fresh`, §4.4) — the FSM itself holds no calendar
    /// or timezone knowledge, so it cannot judge freshness on its own.
    pub fn clear_stale_slot(&mut self, is_fresh: bool) {
        if self.collected_data.slot.is_none() || is_fresh {
            return;
        }
        self.collected_data.slot = None;
        self.collected_data.clear_pending();
        if matches!(
            self.state,
            BookingState::CustomerData | BookingState::Confirmation
        ) {
            self.state = BookingState::SlotSelection;
            self.last_updated = Utc::now();
        }
    }

    /// Booking-conflict recovery (§7 category 5): a concurrent customer
    /// took the slot between `CONFIRMATION` and `book` actually committing.
    /// Clears the slot and any pending stylist-change data and sends the
    /// customer back to slot selection rather than retrying automatically.
    pub fn recover_from_booking_conflict(&mut self) {
        self.collected_data.slot = None;
        self.collected_data.clear_pending();
        self.state = BookingState::SlotSelection;
        self.last_updated = Utc::now();
    }

    /// Reset to `IDLE`, clearing all collected data (the `CANCEL_BOOKING`
    /// global escape hatch, §4.2.2 step 1; also used once `book` succeeds).
    pub fn reset(&mut self) {
        self.state = BookingState::Idle;
        self.collected_data = CollectedData::default();
        self.last_updated = Utc::now();
    }

    /// Reset preserving `customer_id`, used both by `CANCEL_BOOKING` (§4.2.1,
    /// "preserving `customer_id` optionally" — we always preserve it, it is
    /// never booking-flow-specific data) and by re-entering `SERVICE_SELECTION`
    /// from `BOOKED` (§4.2.2 step 6).
    fn reset_preserving_customer(&mut self) {
        let customer_id = self.collected_data.customer_id.take();
        self.collected_data = CollectedData {
            customer_id,
            ..CollectedData::default()
        };
    }

    fn target_state(&self, intent_type: IntentType) -> Option<BookingState> {
        use BookingState::*;
        use IntentType::*;
        match (self.state, intent_type) {
            (Idle, StartBooking) => Some(ServiceSelection),
            (ServiceSelection, SelectService) => Some(ServiceSelection),
            (ServiceSelection, ConfirmServices) => Some(StylistSelection),
            (ServiceSelection, SelectStylist) => {
                // §4.2.1 shortcut: only when a service is already collected
                // and a stylist_id is present among the merged entities.
                if !self.collected_data.services.is_empty() && self.collected_data.stylist_id.is_some() {
                    Some(StylistSelection)
                } else {
                    None
                }
            }
            (StylistSelection, SelectStylist) => Some(SlotSelection),
            (SlotSelection, CheckAvailability) => Some(SlotSelection),
            (SlotSelection, SelectSlot) => Some(CustomerData),
            (SlotSelection, ConfirmStylistChange) => Some(CustomerData),
            (CustomerData, ProvideCustomerData)
            | (CustomerData, UseCustomerName)
            | (CustomerData, ProvideThirdPartyBooking)
            | (CustomerData, ConfirmName)
            | (CustomerData, CorrectName) => Some(CustomerData),
            (Confirmation, ConfirmBooking) => Some(Booked),
            (Booked, StartBooking) => Some(ServiceSelection),
            _ => None,
        }
    }

    /// §4.2.2 — the full transition procedure, with no slot-policy check
    /// (every `SELECT_SLOT` is accepted on shape alone). Prefer
    /// [`Self::transition_with_slot_validator`] wherever a real
    /// [`crate::SlotValidator`]-equivalent is available; this is kept for
    /// callers (tests, `CANCEL_BOOKING`-only flows) that have none.
    pub fn transition(&mut self, intent: &Intent) -> TransitionOutcome {
        self.transition_with_slot_validator(intent, |_start| Ok(()))
    }

    /// §4.2.2 — the full transition procedure. `validate_slot` is run
    /// against the candidate `start_time` whenever `SELECT_SLOT` proposes a
    /// concrete slot (§4.2.2 step 4: "SELECT_SLOT on the slot picker runs
    /// the Slot Validator"); on `Err(reason)` the transition is rejected —
    /// non-fatally, the FSM stays in `SLOT_SELECTION` — with `reason` as the
    /// validation error, mirroring
    /// `original_source/agent/fsm/booking_fsm.py`'s `SlotValidator.validate_complete`
    /// call at its slot-selection branch.
    #[instrument(skip(self, intent, validate_slot), fields(from = %self.state, intent = ?intent.intent_type))]
    pub fn transition_with_slot_validator(
        &mut self,
        intent: &Intent,
        validate_slot: impl Fn(DateTime<Utc>) -> std::result::Result<(), String>,
    ) -> TransitionOutcome {
        let from_state = self.state;

        // Step 1: global CANCEL_BOOKING escape hatch.
        if intent.intent_type == IntentType::CancelBooking {
            self.reset_preserving_customer();
            self.last_updated = Utc::now();
            info!(from = %from_state, to = %self.state, "fsm cancelled");
            return TransitionOutcome::accepted(self.state);
        }

        // Step 2: look up the transition cell.
        let Some(mut to_state) = self.target_state(intent.intent_type) else {
            let errors = vec![format!(
                "transition not allowed from {from_state} via {:?}",
                intent.intent_type
            )];
            warn!(errors = ?errors, "fsm transition rejected");
            return TransitionOutcome::rejected(from_state, errors);
        };

        // Step 3: data requirement check against the *pre-merge* data, so a
        // turn cannot satisfy its own requirement with the entities it is
        // about to contribute (mirrors the source's merged-then-checked
        // read, but our requirement table only inspects already-collected
        // fields — see transitions::missing_requirements).
        let missing = transitions::missing_requirements(from_state, intent.intent_type, &self.collected_data);
        if !missing.is_empty() {
            warn!(missing = ?missing, "fsm transition missing requirements");
            return TransitionOutcome::rejected(from_state, missing);
        }

        // Step 4 special cases.
        if from_state == BookingState::SlotSelection && intent.intent_type == IntentType::SelectSlot {
            if let Some(slot) = intent.entities.get("slot").and_then(|v| v.as_object()) {
                let slot_stylist_id = slot.get("stylist_id").and_then(|v| v.as_str());
                let is_soonest_any = slot.get("is_soonest_any").and_then(|v| v.as_bool()).unwrap_or(false);
                let start = slot
                    .get("start_time")
                    .and_then(|v| v.as_str())
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                // Run the Slot Validator on the proposed candidate before
                // anything else — a structurally-sound but too-soon/closed
                // slot must never reach the pending-stylist-change branch or
                // the merge below (§4.2.2 step 4, §8 scenario #2).
                if let Some(start) = start {
                    if let Err(reason) = validate_slot(start) {
                        warn!(reason = %reason, "proposed slot failed validation");
                        return TransitionOutcome::rejected(from_state, vec![reason]);
                    }
                }

                if let (Some(slot_stylist_id), Some(current)) =
                    (slot_stylist_id, self.collected_data.stylist_id.as_deref())
                {
                    if is_soonest_any && slot_stylist_id != current {
                        self.collected_data.pending_stylist_id = Some(slot_stylist_id.to_string());
                        self.collected_data.pending_stylist_name = slot
                            .get("stylist_name")
                            .and_then(|v| v.as_str())
                            .map(str::to_string);
                        if let Some(start) = start {
                            self.collected_data.pending_slot = Some(crate::data::SlotData {
                                start,
                                stylist_id: slot_stylist_id.to_string(),
                                stylist_name: self.collected_data.pending_stylist_name.clone(),
                            });
                        }
                        self.last_updated = Utc::now();
                        info!("pending stylist change, awaiting confirmation");
                        return TransitionOutcome {
                            success: true,
                            new_state: BookingState::SlotSelection,
                            validation_errors: Vec::new(),
                            awaiting_stylist_change_confirmation: true,
                        };
                    }
                }
            } else if intent.entities.contains_key("slot_time") {
                // Resolve a bare time-of-day against the last-shown slots list.
                let resolved = self.resolve_slot_time(intent);
                if !resolved {
                    return TransitionOutcome::rejected(
                        from_state,
                        vec!["could not match slot_time against slots_shown".to_string()],
                    );
                }
                // `slots_shown` entries come from the Tool Executor's own
                // availability search, which already enforces business
                // hours/lead-time — re-validate anyway so a stale
                // `slots_shown` list (§4.2.4 slot-freshness) can't slip a
                // now-too-soon slot through.
                if let Some(start) = self.collected_data.slot.as_ref().map(|s| s.start) {
                    if let Err(reason) = validate_slot(start) {
                        warn!(reason = %reason, "resolved slot_time slot failed validation");
                        self.collected_data.slot = None;
                        return TransitionOutcome::rejected(from_state, vec![reason]);
                    }
                }
            }
        }

        if from_state == BookingState::SlotSelection && intent.intent_type == IntentType::ConfirmStylistChange {
            if let (Some(pending_id), Some(pending_slot)) = (
                self.collected_data.pending_stylist_id.clone(),
                self.collected_data.pending_slot.clone(),
            ) {
                self.collected_data.stylist_id = Some(pending_id);
                self.collected_data.stylist_name = self.collected_data.pending_stylist_name.clone();
                self.collected_data.slot = Some(pending_slot);
                self.collected_data.clear_pending();
            }
        }

        // Step 5: merge entities.
        self.collected_data.merge_entities(&intent.entities);

        // CUSTOMER_DATA three-phase self-loop (§4.2.2 step 4).
        if from_state == BookingState::CustomerData {
            to_state = self.advance_customer_data(intent);
        }

        // Step 6: state-specific post-hooks.
        if from_state == BookingState::StylistSelection && to_state == BookingState::SlotSelection {
            self.collected_data.pending_stylist_id = None; // date_preference_requested reset happens implicitly: no such flag survives a fresh SLOT_SELECTION entry
        }
        if from_state == BookingState::Booked
            && intent.intent_type == IntentType::StartBooking
            && to_state == BookingState::ServiceSelection
        {
            self.reset_preserving_customer();
        }

        // Step 7: commit.
        self.state = to_state;
        self.last_updated = Utc::now();
        info!(from = %from_state, to = %to_state, "fsm transitioned");
        TransitionOutcome::accepted(to_state)
    }

    /// Resolve `slot_time` (bare HH:MM) against `slots_shown`, mutating the
    /// entity map in place isn't possible (intent is `&Intent`), so instead
    /// we look the match up and write the resolved slot straight into
    /// `collected_data` (spec.md §4.2.2 step 4).
    fn resolve_slot_time(&mut self, intent: &Intent) -> bool {
        let Some(slot_time) = intent.entity_str("slot_time") else {
            return false;
        };
        for shown in &self.collected_data.slots_shown.clone() {
            let shown_time = shown.start.format("%H:%M").to_string();
            if shown_time == slot_time {
                self.collected_data.slot = Some(shown.clone());
                return true;
            }
        }
        false
    }

    /// §4.2.2 step 4, the `CUSTOMER_DATA` three-phase self-loop: (a) acquire
    /// the appointee's first name, (b) ask for notes, (c) only once both are
    /// present does the next `PROVIDE_CUSTOMER_DATA` advance to
    /// `CONFIRMATION`. The FSM — not the classifier — owns `notes_asked`.
    fn advance_customer_data(&mut self, intent: &Intent) -> BookingState {
        match intent.intent_type {
            IntentType::UseCustomerName => {
                self.collected_data.third_party = false;
                BookingState::CustomerData
            }
            IntentType::ConfirmName => {
                self.collected_data.name_confirmed = true;
                BookingState::CustomerData
            }
            IntentType::CorrectName => {
                self.collected_data.name_confirmed = true;
                BookingState::CustomerData
            }
            IntentType::ProvideThirdPartyBooking => {
                self.collected_data.third_party = true;
                BookingState::CustomerData
            }
            IntentType::ProvideCustomerData => {
                let has_name = self.collected_data.customer_name.is_some();
                if has_name && !self.collected_data.name_confirmed {
                    self.collected_data.name_confirmed = true;
                }
                // A message with no new name and a name already on file is
                // read as "notes" (possibly "ninguna" / empty notes).
                if has_name
                    && intent.entity_str("first_name").is_none()
                    && !self.collected_data.notes_asked
                {
                    self.collected_data.notes_asked = true;
                }
                if has_name && self.collected_data.notes_asked {
                    BookingState::Confirmation
                } else {
                    BookingState::CustomerData
                }
            }
            _ => BookingState::CustomerData,
        }
    }

    /// §4.2.3 `getRequiredAction()`.
    pub fn required_action(&self) -> Result<FsmAction, crate::action::ActionError> {
        use crate::templates::*;
        match self.state {
            BookingState::Idle => action_idle(),
            BookingState::ServiceSelection => action_service_selection(&self.collected_data),
            BookingState::StylistSelection => action_stylist_selection(&self.collected_data),
            BookingState::SlotSelection => action_slot_selection(&self.collected_data),
            BookingState::CustomerData => action_customer_data(&self.collected_data),
            BookingState::Confirmation => action_confirmation(&self.collected_data),
            BookingState::Booked => action_booked(&self.collected_data),
        }
    }

    /// SPEC_FULL.md §4.15 — proactive rewrite-pass guidance.
    pub fn response_guidance(&self) -> ResponseGuidance {
        crate::guidance::guidance_for(self.state, &self.collected_data)
    }

    /// The intents this state will accept from the classifier, used to build
    /// the state-aware prompt (§4.3) and by `IntentRouter` validity checks.
    pub fn allowed_intents(&self) -> &'static [IntentType] {
        transitions::allowed_intents(self.state)
    }

    pub fn can_transition(&self, intent_type: IntentType) -> bool {
        transitions::can_transition(self.state, intent_type)
    }
}

/// Empty entity map helper for call sites that build an `Intent` inline.
pub fn no_entities() -> HashMap<String, serde_json::Value> {
    HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(t: IntentType) -> Intent {
        Intent {
            intent_type: t,
            entities: HashMap::new(),
            confidence: 0.9,
            raw_message: "test".to_string(),
            requires_tool: false,
            tool_name: None,
            service_query: None,
        }
    }

    #[test]
    fn idle_to_service_selection() {
        let mut fsm = BookingFsm::new();
        let outcome = fsm.transition(&intent(IntentType::StartBooking));
        assert!(outcome.success);
        assert_eq!(fsm.state(), BookingState::ServiceSelection);
    }

    #[test]
    fn invalid_transition_rejected_state_unchanged() {
        let mut fsm = BookingFsm::new();
        let outcome = fsm.transition(&intent(IntentType::SelectSlot));
        assert!(!outcome.success);
        assert_eq!(fsm.state(), BookingState::Idle);
        assert!(!outcome.validation_errors.is_empty());
    }

    #[test]
    fn confirm_services_requires_nonempty_services() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        let outcome = fsm.transition(&intent(IntentType::ConfirmServices));
        assert!(!outcome.success);
        assert_eq!(fsm.state(), BookingState::ServiceSelection);
    }

    #[test]
    fn cancel_booking_resets_but_keeps_customer_id() {
        let mut fsm = BookingFsm::new();
        fsm.collected_data_mut().customer_id = Some("cust-1".to_string());
        fsm.transition(&intent(IntentType::StartBooking));
        let outcome = fsm.transition(&intent(IntentType::CancelBooking));
        assert!(outcome.success);
        assert_eq!(fsm.state(), BookingState::Idle);
        assert_eq!(fsm.collected_data().customer_id.as_deref(), Some("cust-1"));
        assert!(fsm.collected_data().services.is_empty());
    }

    #[test]
    fn to_dict_from_dict_roundtrip() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte de Caballero");
        let dict = fsm.to_dict();
        let restored = BookingFsm::from_dict(&dict);
        assert_eq!(restored.state(), fsm.state());
        assert_eq!(restored.collected_data().services, fsm.collected_data().services);
    }

    #[test]
    fn from_dict_corrupt_falls_back_to_idle() {
        let restored = BookingFsm::from_dict(&serde_json::json!({"garbage": true}));
        assert_eq!(restored.state(), BookingState::Idle);
        assert!(restored.collected_data().services.is_empty());
    }

    #[test]
    fn customer_data_three_phase_requires_both_name_and_notes() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte");
        fsm.transition(&intent(IntentType::ConfirmServices));
        let mut select_stylist = intent(IntentType::SelectStylist);
        select_stylist
            .entities
            .insert("stylist_id".to_string(), serde_json::json!("sty-1"));
        fsm.transition(&select_stylist);
        let mut select_slot = intent(IntentType::SelectSlot);
        select_slot.entities.insert(
            "slot".to_string(),
            serde_json::json!({"start_time": "2030-01-01T10:00:00+01:00", "stylist_id": "sty-1"}),
        );
        fsm.transition(&select_slot);
        assert_eq!(fsm.state(), BookingState::CustomerData);

        let mut provide_name = intent(IntentType::ProvideCustomerData);
        provide_name
            .entities
            .insert("first_name".to_string(), serde_json::json!("Maite"));
        fsm.transition(&provide_name);
        assert_eq!(fsm.state(), BookingState::CustomerData);
        assert!(!fsm.collected_data().notes_asked);

        // Second provide_customer_data with no new name is read as notes.
        let no_notes = intent(IntentType::ProvideCustomerData);
        fsm.transition(&no_notes);
        assert_eq!(fsm.state(), BookingState::Confirmation);
    }

    #[test]
    fn clear_stale_slot_is_a_no_op_when_fresh() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte");
        fsm.transition(&intent(IntentType::ConfirmServices));
        let mut select_stylist = intent(IntentType::SelectStylist);
        select_stylist
            .entities
            .insert("stylist_id".to_string(), serde_json::json!("sty-1"));
        fsm.transition(&select_stylist);
        let mut select_slot = intent(IntentType::SelectSlot);
        select_slot.entities.insert(
            "slot".to_string(),
            serde_json::json!({"start_time": "2030-01-01T10:00:00+01:00", "stylist_id": "sty-1"}),
        );
        fsm.transition(&select_slot);
        assert_eq!(fsm.state(), BookingState::CustomerData);
        assert!(fsm.collected_data().slot.is_some());

        // §8 scenario #1: the very next turn's checkpoint load must not
        // wipe a slot the caller reports as still fresh.
        fsm.clear_stale_slot(true);
        assert_eq!(fsm.state(), BookingState::CustomerData);
        assert!(fsm.collected_data().slot.is_some());
    }

    #[test]
    fn clear_stale_slot_rewinds_when_stale() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte");
        fsm.transition(&intent(IntentType::ConfirmServices));
        let mut select_stylist = intent(IntentType::SelectStylist);
        select_stylist
            .entities
            .insert("stylist_id".to_string(), serde_json::json!("sty-1"));
        fsm.transition(&select_stylist);
        let mut select_slot = intent(IntentType::SelectSlot);
        select_slot.entities.insert(
            "slot".to_string(),
            serde_json::json!({"start_time": "2030-01-01T10:00:00+01:00", "stylist_id": "sty-1"}),
        );
        fsm.transition(&select_slot);
        assert_eq!(fsm.state(), BookingState::CustomerData);

        fsm.clear_stale_slot(false);
        assert_eq!(fsm.state(), BookingState::SlotSelection);
        assert!(fsm.collected_data().slot.is_none());
    }

    #[test]
    fn clear_stale_slot_no_op_without_a_slot() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.clear_stale_slot(false);
        assert_eq!(fsm.state(), BookingState::ServiceSelection);
    }

    #[test]
    fn select_slot_runs_the_slot_validator() {
        // §8 scenario #2: a slot rejected by the validator must not advance
        // the FSM past SLOT_SELECTION.
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte");
        fsm.transition(&intent(IntentType::ConfirmServices));
        let mut select_stylist = intent(IntentType::SelectStylist);
        select_stylist
            .entities
            .insert("stylist_id".to_string(), serde_json::json!("sty-1"));
        fsm.transition(&select_stylist);

        let mut select_slot = intent(IntentType::SelectSlot);
        select_slot.entities.insert(
            "slot".to_string(),
            serde_json::json!({"start_time": "2030-01-01T10:00:00+01:00", "stylist_id": "sty-1"}),
        );
        let outcome = fsm.transition_with_slot_validator(&select_slot, |_start| {
            Err("appointments must be booked at least 3 days in advance".to_string())
        });
        assert!(!outcome.success);
        assert_eq!(fsm.state(), BookingState::SlotSelection);
        assert!(fsm.collected_data().slot.is_none());
    }

    #[test]
    fn select_slot_accepted_when_validator_passes() {
        let mut fsm = BookingFsm::new();
        fsm.transition(&intent(IntentType::StartBooking));
        fsm.collected_data_mut().add_service("Corte");
        fsm.transition(&intent(IntentType::ConfirmServices));
        let mut select_stylist = intent(IntentType::SelectStylist);
        select_stylist
            .entities
            .insert("stylist_id".to_string(), serde_json::json!("sty-1"));
        fsm.transition(&select_stylist);

        let mut select_slot = intent(IntentType::SelectSlot);
        select_slot.entities.insert(
            "slot".to_string(),
            serde_json::json!({"start_time": "2030-01-01T10:00:00+01:00", "stylist_id": "sty-1"}),
        );
        let outcome = fsm.transition_with_slot_validator(&select_slot, |_start| Ok(()));
        assert!(outcome.success);
        assert_eq!(fsm.state(), BookingState::CustomerData);
        assert!(fsm.collected_data().slot.is_some());
    }
}
