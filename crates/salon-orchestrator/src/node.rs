//! The Orchestrator Node (C11, spec.md §4.1): the end-to-end per-message
//! driver. One call to [`Orchestrator::process_message`] runs the full
//! ten-step turn described there — auto-escalation gate, FSM load, identity
//! injection, classification, transition, routing, audit, counter update,
//! and checkpoint persistence — and returns the text to send back.
//!
//! Grounded on the teacher's `pipeline::process_message_non_streaming`
//! shape (load context → classify/act → persist → return), re-targeted
//! from a single LLM tool-loop to this FSM-driven dispatch, with the
//! teacher's circuit breaker (`engine::http::CircuitBreaker`, see
//! [`crate::breaker`]) wrapping every LLM call instead of every HTTP call.

use chrono::Utc;
use tracing::{info, instrument, warn};

use salon_core::config::AUTO_ESCALATION_THRESHOLD;
use salon_core::types::ConversationId;
use salon_fsm::{BookingFsm, BookingState, Intent};
use salon_handlers::{booking, non_booking, BookingInput, HandlerError, NonBookingInput};
use salon_intent::prompt::HistoryTurn;
use salon_intent::{classifier, OpenRouterClient};
use salon_state::lock::{self, ConversationLock};
use salon_state::{CheckpointStore, ConversationState, MessageRole};
use salon_tools::ToolContext;

use crate::auditor;
use crate::breaker::BreakerRegistry;
use crate::error::Result;

/// Step 1's scripted apology — emitted once `error_count` crosses the
/// threshold, or (§7 category 6) once the state-action auditor or a breaker
/// trip forces the same auto-escalation path.
const AUTO_ESCALATION_REPLY: &str = "Disculpa las molestias, parece que no estoy \
     consiguiendo ayudarte correctamente. Te paso con una persona de nuestro \
     equipo, que te atenderá en breve.";

/// §5/§7 category 3: emitted when a dependency's circuit breaker is open
/// and the call is failed fast rather than attempted.
const DEGRADED_REPLY: &str = "Ahora mismo tengo problemas técnicos para \
     atenderte con normalidad. Un momento, por favor, o inténtalo de nuevo \
     en unos minutos.";

/// §4.1 step 8 / §8: the override the auditor forces when a reply claims a
/// booking that never happened.
const AUDIT_OVERRIDE_REPLY: &str = "Disculpa, ha habido un error técnico y no \
     puedo confirmar que tu cita se haya registrado correctamente. Alguien de \
     nuestro equipo se pondrá en contacto contigo para confirmarlo.";

/// §7 category 5: the slot was taken by someone else between confirmation
/// and commit.
const BOOKING_CONFLICT_REPLY: &str = "Vaya, justo se ha reservado ese hueco. \
     ¿Eliges otro horario disponible?";

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

/// What a completed turn produced — handed back to the pub/sub worker to
/// publish onto `outgoing_messages` (§4.12, §6.2).
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply_text: String,
    pub escalated: bool,
}

/// How a handler failure should be treated (§7's taxonomy, read off the
/// concrete error rather than a second hand-maintained classification).
enum ErrorTreatment {
    /// Recovered locally; FSM state unchanged; surfaced as a friendly
    /// redirect. Not counted against `error_count`.
    Validation,
    /// §7 category 5 — the booking commit lost a race. FSM is rewound to
    /// `SLOT_SELECTION`. Not counted against `error_count`.
    BookingConflict,
    /// §7 category 2/3 — a dependency failed or its breaker is open.
    /// Counted against `error_count`; the named breaker (if identifiable)
    /// records the failure.
    TransientExternal(Option<&'static str>),
    /// §7 category 4 — programmer/configuration error. The turn is
    /// considered crashed: no reply is persisted, the error propagates to
    /// the caller, which logs `CRITICAL` and moves on to the next message.
    Configuration,
}

fn dependency_hint(e: &salon_core::SalonError) -> Option<&'static str> {
    match e {
        salon_core::SalonError::Database(_) => Some("database"),
        salon_core::SalonError::Calendar(_) => Some("calendar"),
        salon_core::SalonError::Messaging(_) => Some("chatwoot"),
        salon_core::SalonError::LlmProvider(_) => Some("openrouter"),
        _ => None,
    }
}

fn treatment_for_core(e: &salon_core::SalonError) -> ErrorTreatment {
    match e.kind() {
        salon_core::ErrorKind::Validation => ErrorTreatment::Validation,
        salon_core::ErrorKind::BookingConflict => ErrorTreatment::BookingConflict,
        salon_core::ErrorKind::TransientExternal => ErrorTreatment::TransientExternal(dependency_hint(e)),
        salon_core::ErrorKind::BreakerOpen => ErrorTreatment::TransientExternal(None),
        salon_core::ErrorKind::Configuration => ErrorTreatment::Configuration,
    }
}

fn treatment_for_tool(e: &salon_tools::ToolError) -> ErrorTreatment {
    use salon_tools::ToolError as TE;
    match e {
        TE::Core(core) => treatment_for_core(core),
        TE::Channel(channel) => {
            let dependency = match channel {
                salon_channels::ChannelError::Api { dependency, .. } => Some(*dependency),
                _ => None,
            };
            if channel.is_transient() {
                ErrorTreatment::TransientExternal(dependency)
            } else {
                ErrorTreatment::Configuration
            }
        }
        TE::Validate(_) | TE::ServiceNotFound { .. } | TE::Ambiguous { .. } | TE::InvalidArgs(_) => {
            ErrorTreatment::Validation
        }
        TE::UnknownTool(_) => ErrorTreatment::Configuration,
    }
}

fn treatment_for(e: &HandlerError) -> ErrorTreatment {
    match e {
        HandlerError::Action(_) => ErrorTreatment::Configuration,
        HandlerError::Core(core) => treatment_for_core(core),
        HandlerError::Tool(tool) | HandlerError::RequiredToolFailed { source: tool, .. } => {
            treatment_for_tool(tool)
        }
    }
}

fn validation_reply(e: &HandlerError) -> String {
    format!(
        "Disculpa, no he podido procesar eso: {e}. ¿Puedes intentarlo de otra forma?"
    )
}

/// Everything the orchestrator needs to run a turn: the checkpoint store
/// (C1), the classifier's LLM client, the tool execution context (C6), and
/// the per-dependency breaker registry (§5).
pub struct Orchestrator {
    pub checkpoints: CheckpointStore,
    pub llm: OpenRouterClient,
    pub tool_ctx: ToolContext,
    pub breakers: BreakerRegistry,
}

impl Orchestrator {
    pub fn new(checkpoints: CheckpointStore, llm: OpenRouterClient, tool_ctx: ToolContext) -> Self {
        Self {
            checkpoints,
            llm,
            tool_ctx,
            breakers: BreakerRegistry::new(),
        }
    }

    /// Runs one full turn for `conversation_id`, holding the per-conversation
    /// lock for the duration (§5: two concurrent messages for the same id
    /// never interleave their FSM transitions).
    #[instrument(skip(self, message_text), fields(conversation_id = %conversation_id))]
    pub async fn process_message(
        &self,
        conversation_id: &ConversationId,
        customer_phone: &str,
        message_text: &str,
    ) -> Result<TurnOutcome> {
        let guard: ConversationLock = lock::acquire(self.checkpoints.pool(), conversation_id).await?;
        let outcome = self.run_turn(conversation_id, customer_phone, message_text).await;
        if let Err(e) = guard.release().await {
            warn!(error = %e, "failed to release conversation lock");
        }
        outcome
    }

    async fn run_turn(
        &self,
        conversation_id: &ConversationId,
        customer_phone: &str,
        message_text: &str,
    ) -> Result<TurnOutcome> {
        let mut state = self.checkpoints.get_or_create(conversation_id, customer_phone).await?;

        // Step 1: auto-escalation gate.
        if state.error_count >= AUTO_ESCALATION_THRESHOLD {
            state.escalated = true;
            self.fire_escalation(conversation_id, customer_phone, "error_count threshold reached").await;
            let fsm = BookingFsm::from_dict(&state.fsm_state);
            return self
                .finish(conversation_id, &mut state, &fsm, message_text, AUTO_ESCALATION_REPLY.to_string(), false)
                .await;
        }

        // Step 2: FSM load + slot-freshness correction (§4.1 step 2, §4.4):
        // drop the collected slot only when it no longer clears the
        // validator's 3-day/business-day rule, not unconditionally.
        let mut fsm = BookingFsm::from_dict(&state.fsm_state);
        let now = Utc::now();
        let slot_fresh = fsm
            .collected_data()
            .slot
            .as_ref()
            .map(|slot| self.tool_ctx.validator.is_fresh(slot.start, now))
            .unwrap_or(true);
        fsm.clear_stale_slot(slot_fresh);

        // Step 3: inject identity.
        if let Some(customer_id) = state.customer_id.clone() {
            fsm.collected_data_mut().customer_id = Some(customer_id);
        }

        // History used for classification is the window *before* this
        // turn's message is appended — matches what the non-booking
        // handler's own prompt assembly reads off `ConversationState`.
        let history_msgs = state.last_k(5);
        let history: Vec<HistoryTurn<'_>> = history_msgs
            .iter()
            .map(|m| HistoryTurn { role: role_label(m.role), content: m.content.as_str() })
            .collect();

        // Step 4: classify, gated by the `openrouter` breaker (§5).
        if !self.breakers.openrouter.allow() {
            return self
                .finish(conversation_id, &mut state, &fsm, message_text, DEGRADED_REPLY.to_string(), true)
                .await;
        }
        let classification = classifier::classify(&self.llm, fsm.state(), fsm.collected_data(), &history, message_text).await;
        if classification.llm_call_failed {
            self.breakers.openrouter.record_failure();
        } else {
            self.breakers.openrouter.record_success();
        }
        let intent: Intent = classification.intent;

        // Step 5: name-confirmation bypass. The FSM's own CUSTOMER_DATA
        // self-loop already refuses to advance past an unconfirmed name
        // except via CONFIRM_NAME/CORRECT_NAME (its transition table has no
        // other outgoing edge from that sub-phase), so the source's
        // separate orchestrator-level bypass is subsumed by step 6/7 below
        // rather than duplicated here. `name_confirmation_pending` is kept
        // on the checkpoint purely for observability (it mirrors the FSM's
        // own notion of the same sub-phase) — see DESIGN.md.
        state.name_confirmation_pending = fsm.state() == BookingState::CustomerData
            && fsm.collected_data().customer_name.is_some()
            && !fsm.collected_data().name_confirmed;

        // Step 6: FSM transition, booking intents only. SELECT_SLOT runs the
        // Slot Validator's policy layer (§4.2.2 step 4, §8 scenario #2) —
        // structural validity was already required to even produce a
        // parseable `start_time` (see `BookingFsm::transition_with_slot_validator`).
        let is_booking = salon_handlers::is_booking_intent(intent.intent_type);
        if is_booking {
            let validator = &self.tool_ctx.validator;
            let outcome = fsm.transition_with_slot_validator(&intent, |start| {
                let result = validator.validate_policy(start, now);
                if result.valid {
                    Ok(())
                } else {
                    Err(result
                        .error_message
                        .unwrap_or_else(|| "that time isn't available".to_string()))
                }
            });
            if !outcome.success {
                info!(errors = ?outcome.validation_errors, "fsm transition rejected, state unchanged");
            }
        }

        // Step 7: route. The `openrouter` breaker also gates the LLM calls
        // handlers make for tool-choice (non-booking) and creative rewrite
        // (both) passes — when open, handlers fall back to their LLM-less
        // paths rather than attempt a call already known to be failing.
        let llm_ref = self.breakers.openrouter.allow().then_some(&self.llm);
        let had_appointment_before = fsm.collected_data().appointment_id.is_some();

        let handler_result = if is_booking {
            let booking_input = BookingInput { ctx: &self.tool_ctx, llm: llm_ref, phone: customer_phone };
            booking::handle(&mut fsm, &booking_input).await
        } else {
            let guidance = fsm.response_guidance();
            let non_booking_input = NonBookingInput {
                ctx: &self.tool_ctx,
                llm: llm_ref,
                state: &state,
                fsm_state: fsm.state(),
                guidance: &guidance,
                conversation_id: Some(conversation_id.as_str()),
            };
            non_booking::handle(&intent, &non_booking_input).await
        };

        match handler_result {
            Ok(reply_text) => {
                // Step 8: state-action audit.
                let appointment_now = fsm.collected_data().appointment_id.is_some();
                let book_invoked_this_turn = !had_appointment_before && appointment_now;
                state.appointment_created = appointment_now;
                let audit = auditor::audit(&reply_text, book_invoked_this_turn, fsm.state(), state.appointment_created);

                if !audit.coherent {
                    warn!(reason = ?audit.reason, "state-action audit failed, overriding reply");
                    state.escalated = true;
                    self.fire_escalation(
                        conversation_id,
                        customer_phone,
                        audit.reason.as_deref().unwrap_or("state-action audit failed"),
                    )
                    .await;
                    return self
                        .finish(conversation_id, &mut state, &fsm, message_text, AUDIT_OVERRIDE_REPLY.to_string(), false)
                        .await;
                }

                self.finish(conversation_id, &mut state, &fsm, message_text, reply_text, false).await
            }
            Err(e) => match treatment_for(&e) {
                ErrorTreatment::Validation => {
                    let reply = validation_reply(&e);
                    self.finish(conversation_id, &mut state, &fsm, message_text, reply, false).await
                }
                ErrorTreatment::BookingConflict => {
                    fsm.recover_from_booking_conflict();
                    self.finish(
                        conversation_id,
                        &mut state,
                        &fsm,
                        message_text,
                        BOOKING_CONFLICT_REPLY.to_string(),
                        false,
                    )
                    .await
                }
                ErrorTreatment::TransientExternal(dependency) => {
                    if let Some(name) = dependency {
                        if let Some(breaker) = self.breakers.get(name) {
                            breaker.record_failure();
                        }
                    }
                    self.finish(conversation_id, &mut state, &fsm, message_text, DEGRADED_REPLY.to_string(), true)
                        .await
                }
                ErrorTreatment::Configuration => {
                    tracing::error!(error = %e, "orchestrator turn crashed on a configuration error");
                    Err(e.into())
                }
            },
        }
    }

    /// Step 10: serialize the FSM, append both sides of this turn to the
    /// message window, refresh `error_count` per step 9, and persist.
    async fn finish(
        &self,
        conversation_id: &ConversationId,
        state: &mut ConversationState,
        fsm: &BookingFsm,
        user_message: &str,
        reply_text: String,
        errored: bool,
    ) -> Result<TurnOutcome> {
        state.fsm_state = fsm.to_dict();
        state.push_message(MessageRole::User, user_message);
        state.push_message(MessageRole::Assistant, reply_text.clone());
        state.error_count = if errored { state.error_count + 1 } else { 0 };

        self.checkpoints.put(conversation_id, state).await?;

        Ok(TurnOutcome { reply_text, escalated: state.escalated })
    }

    /// Fire-and-forget escalation side effect (§4.1 step 1, §7 category 6):
    /// disable bot handling at the messaging gateway and raise an admin
    /// notification. Reuses the `escalate_to_human` tool body directly
    /// rather than duplicating it, since the side effects are identical.
    async fn fire_escalation(&self, conversation_id: &ConversationId, phone: &str, reason: &str) {
        let args = serde_json::json!({
            "conversation_id": conversation_id.as_str(),
            "phone": phone,
            "reason": reason,
        });
        if let Err(e) = salon_tools::tools::escalate::run(&self.tool_ctx, &args).await {
            warn!(error = %e, "escalation side effect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::SalonError;

    #[test]
    fn role_label_matches_chat_roles() {
        assert_eq!(role_label(MessageRole::User), "user");
        assert_eq!(role_label(MessageRole::Assistant), "assistant");
        assert_eq!(role_label(MessageRole::System), "system");
    }

    #[test]
    fn core_validation_error_maps_to_validation() {
        let e = SalonError::SlotInvalid("too soon".to_string());
        assert!(matches!(treatment_for_core(&e), ErrorTreatment::Validation));
    }

    #[test]
    fn core_booking_conflict_maps_to_booking_conflict() {
        assert!(matches!(
            treatment_for_core(&SalonError::BookingConflict),
            ErrorTreatment::BookingConflict
        ));
    }

    #[test]
    fn core_database_error_names_the_database_dependency() {
        let e = SalonError::Database("deadlock".to_string());
        match treatment_for_core(&e) {
            ErrorTreatment::TransientExternal(Some(dep)) => assert_eq!(dep, "database"),
            _ => panic!("expected TransientExternal(\"database\")"),
        }
    }

    #[test]
    fn core_llm_provider_error_names_the_openrouter_dependency() {
        let e = SalonError::LlmProvider("timeout".to_string());
        match treatment_for_core(&e) {
            ErrorTreatment::TransientExternal(Some(dep)) => assert_eq!(dep, "openrouter"),
            _ => panic!("expected TransientExternal(\"openrouter\")"),
        }
    }

    #[test]
    fn core_breaker_open_is_transient_with_no_named_dependency() {
        let e = SalonError::BreakerOpen { dependency: "calendar".to_string() };
        assert!(matches!(treatment_for_core(&e), ErrorTreatment::TransientExternal(None)));
    }

    #[test]
    fn core_configuration_error_propagates() {
        let e = SalonError::Internal("assertion failed".to_string());
        assert!(matches!(treatment_for_core(&e), ErrorTreatment::Configuration));
    }

    #[test]
    fn channel_5xx_is_transient_and_named() {
        let e = salon_channels::ChannelError::Api {
            dependency: "chatwoot",
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(matches!(
            treatment_for_tool(&salon_tools::ToolError::Channel(e)),
            ErrorTreatment::TransientExternal(Some("chatwoot"))
        ));
    }

    #[test]
    fn channel_config_error_is_not_transient() {
        let e = salon_channels::ChannelError::ConfigError("missing api key".to_string());
        assert!(matches!(
            treatment_for_tool(&salon_tools::ToolError::Channel(e)),
            ErrorTreatment::Configuration
        ));
    }

    #[test]
    fn tool_service_not_found_is_a_validation_error() {
        let e = salon_tools::ToolError::ServiceNotFound { query: "manicura".to_string() };
        assert!(matches!(treatment_for_tool(&e), ErrorTreatment::Validation));
    }

    #[test]
    fn unknown_tool_is_a_configuration_error() {
        let e = salon_tools::ToolError::UnknownTool("frobnicate".to_string());
        assert!(matches!(treatment_for_tool(&e), ErrorTreatment::Configuration));
    }
}
