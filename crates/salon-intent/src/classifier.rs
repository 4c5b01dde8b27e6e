//! Intent Classifier (C3, spec.md §4.3): one LLM call per turn, mapped down
//! to a typed [`Intent`], never propagating an LLM failure as an error — a
//! synthetic `UNKNOWN` is always a legal outcome here.

use std::collections::HashMap;

use regex::Regex;
use salon_core::config::CONFIDENCE_THRESHOLD;
use salon_fsm::{BookingState, CollectedData, Intent, IntentType};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::llm::{ChatMessage, OpenRouterClient};
use crate::prompt::{self, HistoryTurn};

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent_type: String,
    #[serde(default)]
    entities: HashMap<String, Value>,
    confidence: f32,
    #[serde(default)]
    service_query: Option<String>,
}

fn unknown(raw_message: &str) -> Intent {
    Intent {
        intent_type: IntentType::Unknown,
        entities: HashMap::new(),
        confidence: 0.0,
        raw_message: raw_message.to_string(),
        requires_tool: false,
        tool_name: None,
        service_query: None,
    }
}

/// Strips a leading/trailing ``` fence (with or without a `json` tag) before
/// parsing — models routinely wrap structured output in markdown even when
/// told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(body) = rest.strip_suffix("```") {
            return body.trim();
        }
        return rest.trim();
    }
    trimmed
}

fn intent_type_from_name(name: &str) -> Option<IntentType> {
    // IntentType serializes as SCREAMING_SNAKE_CASE; round-trip through serde
    // rather than hand-maintaining a second name table.
    serde_json::from_value(Value::String(name.to_string())).ok()
}

/// Parses the classifier's raw text into an [`Intent`], applying the
/// confidence gate and the allowed-intent-for-state check. Never returns
/// `Err` — unparseable or sub-threshold output degrades to `UNKNOWN`.
fn parse(raw_message: &str, text: &str, allowed: &[IntentType]) -> Intent {
    let body = strip_code_fence(text);
    let parsed: RawClassification = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, raw = %text, "classifier returned unparseable json, falling back to UNKNOWN");
            return unknown(raw_message);
        }
    };

    if parsed.confidence < CONFIDENCE_THRESHOLD {
        return unknown(raw_message);
    }

    let Some(intent_type) = intent_type_from_name(&parsed.intent_type) else {
        warn!(name = %parsed.intent_type, "classifier named an intent outside the enum, falling back to UNKNOWN");
        return unknown(raw_message);
    };

    if !allowed.contains(&intent_type) && intent_type != IntentType::CancelBooking {
        warn!(?intent_type, "classifier named an intent not valid from this state, falling back to UNKNOWN");
        return unknown(raw_message);
    }

    Intent {
        intent_type,
        entities: parsed.entities,
        confidence: parsed.confidence,
        raw_message: raw_message.to_string(),
        requires_tool: false,
        tool_name: None,
        service_query: parsed.service_query,
    }
}

/// Bare single-token numeric replies ("1", "2 ") are handled before the LLM
/// call at all in some deployments, but here we simply make sure the prompt
/// carries the disambiguation hint (`prompt::build`) and let the model
/// resolve it — this regex exists only to decide whether a reply is exactly
/// the filler affirmatives the scheduler's confirmation tail treats
/// specially (kept here since both modules need the same three-word rule,
/// and this crate is the lower one in the dependency graph).
pub fn is_short_reply(message: &str) -> bool {
    message.trim().split_whitespace().count() <= 3
}

static AFFIRMATIVE_RE_SRC: &str = r"(?i)^\s*(s[ií]|vale|ok(?:ay)?|confirmo|perfecto|claro|de acuerdo)\s*[.!]?\s*$";
static NEGATIVE_RE_SRC: &str = r"(?i)^\s*(no|cancela(?:r)?|no puedo|mejor no)\s*[.!]?\s*$";

pub fn is_canned_affirmative(message: &str) -> bool {
    Regex::new(AFFIRMATIVE_RE_SRC).map(|re| re.is_match(message.trim())).unwrap_or(false)
}

pub fn is_canned_negative(message: &str) -> bool {
    Regex::new(NEGATIVE_RE_SRC).map(|re| re.is_match(message.trim())).unwrap_or(false)
}

/// The result of one classification call, plus whether the underlying LLM
/// request itself failed (as opposed to succeeding but returning something
/// unparseable or sub-threshold). The orchestrator's `openrouter` circuit
/// breaker (§5) only cares about the former — a model that answers but
/// answers badly is not a dependency outage.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub intent: Intent,
    pub llm_call_failed: bool,
}

/// Classifies one user turn against the current FSM position.
///
/// LLM network/timeout/malformed-response errors never propagate: they
/// degrade to a synthetic `UNKNOWN` with confidence 0, same as a parse
/// failure or a sub-threshold confidence (§4.3 "Failure mode").
pub async fn classify(
    client: &OpenRouterClient,
    state: BookingState,
    data: &CollectedData,
    history: &[HistoryTurn<'_>],
    message: &str,
) -> ClassificationOutcome {
    let allowed = salon_fsm::transitions::allowed_intents(state);
    let (system, user) = prompt::build(state, allowed, data, history, message);

    let messages = [ChatMessage::system(system), ChatMessage::user(user)];

    match client.complete(&messages).await {
        Ok(outcome) => ClassificationOutcome {
            intent: parse(message, &outcome.content, allowed),
            llm_call_failed: false,
        },
        Err(e) => {
            warn!(error = %e, "llm call failed during classification, falling back to UNKNOWN");
            ClassificationOutcome {
                intent: unknown(message),
                llm_call_failed: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let wrapped = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        let wrapped = "```\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"a\":1}");
    }

    #[test]
    fn passes_through_unfenced() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn unparseable_json_falls_back_to_unknown() {
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::Idle);
        let intent = parse("hola", "not json at all", allowed);
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn below_threshold_confidence_falls_back_to_unknown() {
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::Idle);
        let text = r#"{"intent_type":"START_BOOKING","entities":{},"confidence":0.4}"#;
        let intent = parse("quiero una cita", text, allowed);
        assert_eq!(intent.intent_type, IntentType::Unknown);
    }

    #[test]
    fn unknown_intent_name_falls_back_to_unknown() {
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::Idle);
        let text = r#"{"intent_type":"FLY_TO_THE_MOON","entities":{},"confidence":0.9}"#;
        let intent = parse("vamos a la luna", text, allowed);
        assert_eq!(intent.intent_type, IntentType::Unknown);
    }

    #[test]
    fn intent_not_allowed_from_state_falls_back_to_unknown() {
        // SELECT_SLOT is not valid from IDLE.
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::Idle);
        let text = r#"{"intent_type":"SELECT_SLOT","entities":{},"confidence":0.95}"#;
        let intent = parse("el primero", text, allowed);
        assert_eq!(intent.intent_type, IntentType::Unknown);
    }

    #[test]
    fn valid_high_confidence_intent_is_accepted() {
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::Idle);
        let text = r#"{"intent_type":"START_BOOKING","entities":{"service":"corte"},"confidence":0.92}"#;
        let intent = parse("quiero reservar un corte", text, allowed);
        assert_eq!(intent.intent_type, IntentType::StartBooking);
        assert_eq!(intent.entity_str("service"), Some("corte"));
    }

    #[test]
    fn cancel_booking_always_allowed() {
        let allowed = salon_fsm::transitions::allowed_intents(BookingState::ServiceSelection);
        let text = r#"{"intent_type":"CANCEL_BOOKING","entities":{},"confidence":0.99}"#;
        let intent = parse("ya no quiero", text, allowed);
        assert_eq!(intent.intent_type, IntentType::CancelBooking);
    }

    #[test]
    fn short_reply_threshold() {
        assert!(is_short_reply("si"));
        assert!(is_short_reply("no gracias"));
        assert!(!is_short_reply("si, confirmo la cita para mañana por favor"));
    }

    #[test]
    fn canned_affirmative_and_negative() {
        assert!(is_canned_affirmative("Sí"));
        assert!(is_canned_affirmative("vale."));
        assert!(is_canned_negative("No"));
        assert!(!is_canned_affirmative("no"));
    }
}
