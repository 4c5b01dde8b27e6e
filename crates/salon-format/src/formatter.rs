//! Response Formatter (C7, spec.md §4.7): renders the FSM's chosen template
//! deterministically, then optionally asks the LLM to restyle the result
//! without changing any fact in it. Falls back to a plain summary of
//! `collected_data` if the template itself fails to render — a formatting
//! bug must never turn into a silent or crashed turn.

use minijinja::Environment;
use salon_fsm::{CollectedData, FsmAction, ResponseGuidance};
use salon_intent::{ChatMessage, OpenRouterClient};
use tracing::warn;

use crate::error::Result;

const REWRITE_INSTRUCTION: &str =
    "Rewrite the following message preserving every number, list item, name, \
     and order exactly. You may adjust tone and add 1-2 emojis. Do not invent \
     or omit any fact. Reply in the same language as the original message, \
     with no preamble, just the rewritten message.";

/// Step 1 of §4.7: deterministic render, no LLM involved.
pub fn render(action: &FsmAction) -> Result<String> {
    let template = action
        .response_template
        .as_deref()
        .unwrap_or_default();
    let env = Environment::new();
    let rendered = env.render_str(template, &action.template_vars)?;
    Ok(rendered)
}

/// Step 3 of §4.7: the creative rewrite pass, folding in §4.15's proactive
/// guidance as a hard constraint so the LLM can't wander into content the
/// current FSM state hasn't earned yet (slots before a stylist is picked,
/// a confirmation claim before the customer has said yes, and so on).
pub async fn rewrite(
    client: &OpenRouterClient,
    rendered: &str,
    guidance: &ResponseGuidance,
) -> std::result::Result<String, salon_intent::LlmError> {
    let mut system = REWRITE_INSTRUCTION.to_string();
    if !guidance.must_show.is_empty() {
        system.push_str(&format!(" Must show: {}.", guidance.must_show.join(", ")));
    }
    if !guidance.must_ask.is_empty() {
        system.push_str(&format!(" Must ask: {}.", guidance.must_ask.join(", ")));
    }
    if !guidance.forbidden.is_empty() {
        system.push_str(&format!(" Never mention: {}.", guidance.forbidden.join(", ")));
    }

    let messages = [
        ChatMessage::system(system),
        ChatMessage::user(rendered.to_string()),
    ];

    let outcome = client.complete(&messages).await?;
    if outcome.content.trim().is_empty() {
        // An empty rewrite is worse than no rewrite at all.
        return Ok(rendered.to_string());
    }
    Ok(outcome.content)
}

/// A template-render failure must not crash or silently drop the turn —
/// fall back to a plain, fact-only summary built directly off the data
/// the template would have rendered.
fn safe_summary(data: &CollectedData) -> String {
    let mut lines = vec!["Estamos procesando tu solicitud.".to_string()];
    if !data.services.is_empty() {
        lines.push(format!("Servicios: {}", data.service_names().join(", ")));
    }
    if let Some(name) = &data.stylist_name {
        lines.push(format!("Estilista: {name}"));
    }
    if let Some(slot) = &data.slot {
        lines.push(format!("Fecha propuesta: {}", slot.start.to_rfc3339()));
    }
    if let Some(name) = &data.customer_name {
        lines.push(format!("A nombre de: {name}"));
    }
    lines.push("Por favor, dime cómo quieres continuar.".to_string());
    lines.join("\n")
}

/// Full pipeline: render, then optionally rewrite, falling back to
/// [`safe_summary`] on a render failure. Never returns an error — formatting
/// must always produce *some* reply for the orchestrator to send.
pub async fn format(
    action: &FsmAction,
    guidance: &ResponseGuidance,
    data: &CollectedData,
    client: Option<&OpenRouterClient>,
) -> String {
    let rendered = match render(action) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "template render failed, falling back to safe summary");
            return safe_summary(data);
        }
    };

    if !action.allow_llm_creativity {
        return rendered;
    }

    let Some(client) = client else {
        return rendered;
    };

    match rewrite(client, &rendered, guidance).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "llm rewrite failed, returning deterministic render");
            rendered
        }
    }
}

/// Formats already-composed plain text (the non-booking handler's own
/// replies never go through an `FsmAction` template) through the same
/// optional creative pass.
pub async fn format_plain(
    text: &str,
    guidance: &ResponseGuidance,
    allow_llm_creativity: bool,
    client: Option<&OpenRouterClient>,
) -> String {
    if !allow_llm_creativity {
        return text.to_string();
    }
    let Some(client) = client else {
        return text.to_string();
    };
    match rewrite(client, text, guidance).await {
        Ok(rewritten) => rewritten,
        Err(e) => {
            warn!(error = %e, "llm rewrite failed, returning original text");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_fsm::ToolCall;
    use std::collections::HashMap;

    #[test]
    fn renders_plain_template() {
        let action = FsmAction::response(
            "Hola {{ name }}",
            HashMap::from([("name".to_string(), serde_json::json!("Ana"))]),
            false,
        )
        .unwrap();
        assert_eq!(render(&action).unwrap(), "Hola Ana");
    }

    #[test]
    fn renders_loop_template() {
        let action = FsmAction::response(
            "{% for s in services %}- {{ s }}\n{% endfor %}",
            HashMap::from([(
                "services".to_string(),
                serde_json::json!(["Corte", "Tinte"]),
            )]),
            false,
        )
        .unwrap();
        assert_eq!(render(&action).unwrap(), "- Corte\n- Tinte\n");
    }

    #[test]
    fn tool_action_has_no_template_to_render() {
        let action = FsmAction::tools(vec![ToolCall::new("list_services", HashMap::new())]).unwrap();
        // response_template is None; render() treats this as an empty template.
        assert_eq!(render(&action).unwrap(), "");
    }

    #[test]
    fn safe_summary_includes_known_fields() {
        let mut data = CollectedData::default();
        data.add_service("Corte");
        data.customer_name = Some("Ana".to_string());
        let summary = safe_summary(&data);
        assert!(summary.contains("Corte"));
        assert!(summary.contains("Ana"));
    }
}
