use serde_json::{json, Value};

use salon_core::domain::Notification;

use crate::context::ToolContext;
use crate::error::Result;

/// `escalate_to_human` (§4.6): hand the conversation off. `conversation_id`,
/// `phone`, and the last few message bodies are injected by the caller
/// (never chosen by the LLM, §4.10) alongside whatever `reason` the model
/// supplied. Fire-and-forget: the customer-facing reply does not wait on
/// the notification write succeeding.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let conversation_id = args.get("conversation_id").and_then(Value::as_str);
    let phone = args.get("phone").and_then(Value::as_str).unwrap_or("unknown");
    let reason = args
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("customer requested a human agent");

    if let Some(conversation_id) = conversation_id {
        let mut attributes = std::collections::HashMap::new();
        attributes.insert("atencion_automatica".to_string(), json!(false));
        if let Err(e) = ctx
            .messaging
            .update_conversation_custom_attributes(conversation_id, &attributes)
            .await
        {
            tracing::warn!(error = %e, conversation_id, "failed to disable bot attention on escalation");
        }
    }

    let notification = Notification {
        notification_type: "escalation".to_string(),
        title: "Conversation escalated to a human agent".to_string(),
        message: format!("phone {phone}: {reason}"),
        entity_type: "conversation".to_string(),
        entity_id: conversation_id.unwrap_or(phone).to_string(),
    };
    if let Err(e) = salon_db::notifications::create(&ctx.pool, &notification).await {
        tracing::warn!(error = %e, phone, "failed to record escalation notification");
    }

    Ok(json!({ "escalated": true }))
}
