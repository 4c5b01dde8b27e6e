//! Non-Booking Handler (C10, spec.md §4.10): everything the classifier
//! hands back that isn't one of the nine booking-flow intents — small
//! talk, FAQs, the name-update shortcut, and the appointment
//! confirmation/decline and cancellation tails (§4.13, SPEC_FULL.md §4.14).

use serde_json::{json, Value};

use salon_core::domain::{AppointmentStatus, Notification};
use salon_core::types::CustomerId;
use salon_fsm::{BookingState, Intent, IntentType, ResponseGuidance};
use salon_intent::{classifier, ChatMessage, OpenRouterClient};
use salon_state::{ConversationState, MessageRole};
use salon_tools::{ToolContext, ESCALATE_TO_HUMAN, MANAGE_CUSTOMER, NON_BOOKING_TOOLSET, QUERY_INFO, SEARCH_SERVICES};

use crate::error::Result;

const PERSONA: &str = "Eres el asistente conversacional del salón por WhatsApp. \
     Responde en español, de forma breve y cordial. No inventes datos: usa \
     únicamente las herramientas disponibles para consultar información real.";

pub struct NonBookingInput<'a> {
    pub ctx: &'a ToolContext,
    pub llm: Option<&'a OpenRouterClient>,
    pub state: &'a ConversationState,
    pub fsm_state: BookingState,
    pub guidance: &'a ResponseGuidance,
    pub conversation_id: Option<&'a str>,
}

pub async fn handle(intent: &Intent, input: &NonBookingInput<'_>) -> Result<String> {
    match intent.intent_type {
        IntentType::UpdateName => handle_update_name(intent, input).await,
        IntentType::ConfirmAppointment => {
            handle_confirmation_reply(input, AppointmentStatus::Confirmed, &intent.raw_message).await
        }
        IntentType::DeclineAppointment => {
            handle_confirmation_reply(input, AppointmentStatus::Cancelled, &intent.raw_message).await
        }
        IntentType::CheckMyAppointments => handle_check_my_appointments(input).await,
        IntentType::InitiateCancellation => handle_initiate_cancellation(input).await,
        IntentType::SelectCancellation => handle_select_cancellation(intent, input).await,
        IntentType::ConfirmCancellation => handle_confirm_cancellation(intent, input).await,
        IntentType::AbortCancellation => Ok(canned(input, "De acuerdo, no cancelo ninguna cita.").await),
        IntentType::InsistCancellation => {
            Ok(canned(input, "¿Seguro que quieres cancelar? Responde con el número de la cita para confirmarlo.").await)
        }
        IntentType::ConfirmDecline => Ok(canned(input, "Entendido, la cita queda cancelada.").await),
        IntentType::AbortDecline => {
            Ok(canned(input, "Perfecto, mantenemos tu cita. Avísanos si necesitas algo más.").await)
        }
        _ => handle_general(intent, input).await,
    }
}

async fn canned(input: &NonBookingInput<'_>, text: &str) -> String {
    salon_format::format_plain(text, input.guidance, true, input.llm).await
}

fn customer_id(state: &ConversationState) -> Option<CustomerId> {
    state.customer_id.as_deref().map(CustomerId::from)
}

// ---- UPDATE_NAME -----------------------------------------------------

async fn handle_update_name(intent: &Intent, input: &NonBookingInput<'_>) -> Result<String> {
    let Some(first_name) = intent.entity_str("first_name") else {
        return Ok(canned(input, "¿Cuál es tu nombre completo?").await);
    };
    let last_name = intent.entity_str("last_name");

    let mut args = serde_json::Map::new();
    args.insert("phone".to_string(), json!(input.state.customer_phone));
    args.insert("first_name".to_string(), json!(first_name));
    if let Some(last_name) = last_name {
        args.insert("last_name".to_string(), json!(last_name));
    }

    salon_tools::execute(input.ctx, MANAGE_CUSTOMER, &Value::Object(args)).await?;

    let reply = format!("Gracias, he actualizado tu nombre a {first_name}.");
    Ok(canned(input, &reply).await)
}

// ---- CONFIRM_APPOINTMENT / DECLINE_APPOINTMENT (§4.13 tail) ----------

async fn handle_confirmation_reply(
    input: &NonBookingInput<'_>,
    new_status: AppointmentStatus,
    raw_message: &str,
) -> Result<String> {
    let Some(customer_id) = customer_id(input.state) else {
        return Ok(canned(input, "No encuentro una cita tuya pendiente de confirmar.").await);
    };

    let Some(appointment) = salon_db::appointments::find_awaiting_reply(&input.ctx.pool, &customer_id).await? else {
        return Ok(canned(input, "No tienes ninguna cita pendiente de confirmar en este momento.").await);
    };

    salon_db::appointments::set_status(&input.ctx.pool, &appointment.id, new_status).await?;

    if new_status == AppointmentStatus::Cancelled {
        if let Some(event_id) = &appointment.calendar_event_id {
            if let Some(stylist) = salon_db::stylists::get_by_id(&input.ctx.pool, &appointment.stylist_id).await? {
                if let Err(e) = input.ctx.calendar.delete_event(&stylist.calendar_id, event_id).await {
                    tracing::warn!(error = %e, appointment_id = appointment.id.as_str(), "failed to delete calendar event on decline");
                }
            }
        }
    }

    let notification = Notification {
        notification_type: if new_status == AppointmentStatus::Confirmed {
            "appointment_confirmed"
        } else {
            "appointment_cancelled"
        }
        .to_string(),
        title: "Customer replied to appointment confirmation".to_string(),
        message: format!("appointment {} -> {}", appointment.id.as_str(), new_status.as_str()),
        entity_type: "appointment".to_string(),
        entity_id: appointment.id.as_str().to_string(),
    };
    if let Err(e) = salon_db::notifications::create(&input.ctx.pool, &notification).await {
        tracing::warn!(error = %e, "failed to record confirmation-reply notification");
    }

    let default_text = if new_status == AppointmentStatus::Confirmed {
        "¡Perfecto! Tu cita queda confirmada. Te esperamos."
    } else {
        "De acuerdo, hemos cancelado tu cita. Si quieres reprogramarla, dímelo cuando quieras."
    };

    // Short canned replies ("sí", "no puedo") skip the LLM entirely — §11.
    if classifier::is_short_reply(raw_message)
        && (classifier::is_canned_affirmative(raw_message) || classifier::is_canned_negative(raw_message))
    {
        return Ok(default_text.to_string());
    }
    Ok(canned(input, default_text).await)
}

// ---- CHECK_MY_APPOINTMENTS --------------------------------------------

async fn handle_check_my_appointments(input: &NonBookingInput<'_>) -> Result<String> {
    let Some(customer_id) = customer_id(input.state) else {
        return Ok(canned(input, "Todavía no te tengo identificado como cliente, ¿me dices tu nombre?").await);
    };
    let appointments = salon_db::appointments::list_active_by_customer(&input.ctx.pool, &customer_id).await?;
    if appointments.is_empty() {
        return Ok(canned(input, "No tienes citas activas en este momento.").await);
    }

    let mut lines = vec!["Estas son tus próximas citas:".to_string()];
    for (i, appt) in appointments.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, describe_appointment(input.ctx, appt).await));
    }
    Ok(canned(input, &lines.join("\n")).await)
}

// ---- Cancellation sub-flow (SPEC_FULL.md §4.14) -----------------------

async fn handle_initiate_cancellation(input: &NonBookingInput<'_>) -> Result<String> {
    let Some(customer_id) = customer_id(input.state) else {
        return Ok(canned(input, "Todavía no te tengo identificado como cliente, ¿me dices tu nombre?").await);
    };
    let appointments = salon_db::appointments::list_active_by_customer(&input.ctx.pool, &customer_id).await?;
    if appointments.is_empty() {
        return Ok(canned(input, "No tienes citas activas para cancelar.").await);
    }

    let mut lines = vec!["¿Cuál de estas citas quieres cancelar? Responde con el número:".to_string()];
    for (i, appt) in appointments.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, describe_appointment(input.ctx, appt).await));
    }
    Ok(canned(input, &lines.join("\n")).await)
}

fn parse_index(intent: &Intent) -> Option<usize> {
    if let Some(n) = intent.entities.get("appointment_index").and_then(Value::as_u64) {
        return Some(n as usize);
    }
    intent
        .raw_message
        .split_whitespace()
        .find_map(|token| token.trim_matches(|c: char| !c.is_ascii_digit()).parse::<usize>().ok())
}

async fn handle_select_cancellation(intent: &Intent, input: &NonBookingInput<'_>) -> Result<String> {
    let Some(customer_id) = customer_id(input.state) else {
        return Ok(canned(input, "Todavía no te tengo identificado como cliente, ¿me dices tu nombre?").await);
    };
    let appointments = salon_db::appointments::list_active_by_customer(&input.ctx.pool, &customer_id).await?;
    let Some(index) = parse_index(intent) else {
        return Ok(canned(input, "No he entendido el número de la cita. ¿Puedes indicarlo de nuevo?").await);
    };
    let Some(appointment) = appointments.get(index.saturating_sub(1)) else {
        return Ok(canned(input, "No encuentro esa cita en tu lista. Revisa el número e inténtalo de nuevo.").await);
    };

    let reply = format!(
        "¿Confirmas que quieres cancelar tu cita: {}? Responde sí para confirmar.",
        describe_appointment(input.ctx, appointment).await
    );
    Ok(canned(input, &reply).await)
}

async fn handle_confirm_cancellation(intent: &Intent, input: &NonBookingInput<'_>) -> Result<String> {
    let Some(customer_id) = customer_id(input.state) else {
        return Ok(canned(input, "Todavía no te tengo identificado como cliente, ¿me dices tu nombre?").await);
    };
    let appointments = salon_db::appointments::list_active_by_customer(&input.ctx.pool, &customer_id).await?;
    if appointments.is_empty() {
        return Ok(canned(input, "Ya no tienes citas activas.").await);
    }

    // A lone active appointment needs no index; otherwise the customer's
    // reply must still carry the number they were shown (§4.14, no
    // additional cancellation state is persisted between turns).
    let index = if appointments.len() == 1 { 1 } else { parse_index(intent).unwrap_or(0) };
    let Some(appointment) = appointments.get(index.saturating_sub(1)) else {
        return Ok(canned(input, "No he entendido qué cita confirmar. Dime de nuevo el número.").await);
    };

    salon_db::appointments::set_status(&input.ctx.pool, &appointment.id, AppointmentStatus::Cancelled).await?;
    if let Some(event_id) = &appointment.calendar_event_id {
        if let Some(stylist) = salon_db::stylists::get_by_id(&input.ctx.pool, &appointment.stylist_id).await? {
            if let Err(e) = input.ctx.calendar.delete_event(&stylist.calendar_id, event_id).await {
                tracing::warn!(error = %e, appointment_id = appointment.id.as_str(), "failed to delete calendar event on cancellation");
            }
        }
    }
    let notification = Notification {
        notification_type: "appointment_cancelled".to_string(),
        title: "Customer cancelled an appointment".to_string(),
        message: format!("appointment {} cancelled by customer", appointment.id.as_str()),
        entity_type: "appointment".to_string(),
        entity_id: appointment.id.as_str().to_string(),
    };
    if let Err(e) = salon_db::notifications::create(&input.ctx.pool, &notification).await {
        tracing::warn!(error = %e, "failed to record cancellation notification");
    }

    Ok(canned(input, "Listo, tu cita ha sido cancelada.").await)
}

async fn describe_appointment(ctx: &ToolContext, appointment: &salon_core::domain::Appointment) -> String {
    let stylist_name = salon_db::stylists::get_by_id(&ctx.pool, &appointment.stylist_id)
        .await
        .ok()
        .flatten()
        .map(|s| s.name)
        .unwrap_or_else(|| "tu estilista".to_string());
    format!("{} con {stylist_name}", appointment.start_time.to_rfc3339())
}

// ---- General (GREETING / FAQ / CHECK_AVAILABILITY / ESCALATE / UNKNOWN) --

async fn handle_general(intent: &Intent, input: &NonBookingInput<'_>) -> Result<String> {
    let Some(client) = input.llm else {
        return Ok(canned(input, "Un momento, en breve te atenderemos.").await);
    };

    let system = build_system_prompt(input);
    let mut messages = vec![ChatMessage::system(system)];
    for m in input.state.last_k(5) {
        match m.role {
            MessageRole::User => messages.push(ChatMessage::user(m.content.clone())),
            MessageRole::Assistant => messages.push(ChatMessage::assistant(m.content.clone())),
            MessageRole::System => {}
        }
    }
    messages.push(ChatMessage::user(intent.raw_message.clone()));

    let tool_defs: Vec<Value> = salon_tools::registry::definitions(NON_BOOKING_TOOLSET)
        .into_iter()
        .map(|spec| json!({"type": "function", "function": {"name": spec.name, "description": spec.description, "parameters": spec.parameters}}))
        .collect();

    let outcome = match client.complete_with_tools(&messages, &tool_defs).await {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(error = %e, "non-booking llm call failed");
            return Ok("Ahora mismo no puedo responder, ¿puedes intentarlo de nuevo en un momento?".to_string());
        }
    };

    let mut tool_summaries: Vec<String> = Vec::new();
    for call in &outcome.tool_calls {
        let args = build_tool_call_args(&call.name, &call.arguments, input);
        match salon_tools::execute(input.ctx, &call.name, &args).await {
            Ok(result) => tool_summaries.push(summarize_tool_result(&call.name, &result)),
            Err(e) => tracing::warn!(tool = %call.name, error = %e, "non-booking tool call failed"),
        }
    }

    let reply = if !outcome.content.trim().is_empty() {
        outcome.content
    } else if !tool_summaries.is_empty() {
        tool_summaries.join("\n")
    } else {
        "¿Puedes contarme un poco más sobre lo que necesitas?".to_string()
    };

    Ok(salon_format::format_plain(&reply, input.guidance, true, Some(client)).await)
}

fn build_system_prompt(input: &NonBookingInput<'_>) -> String {
    let mut system = PERSONA.to_string();
    if input.fsm_state != BookingState::Idle {
        system.push_str(&format!(
            " El cliente está a mitad de una reserva (estado: {}); no inicies una reserva nueva tú mismo.",
            input.fsm_state
        ));
    }
    match &input.state.customer_id {
        Some(_) => system.push_str(" Ya conocemos a este cliente."),
        None => system.push_str(" Todavía no sabemos el nombre de este cliente."),
    }
    system
}

/// `escalate_to_human` never lets the model choose its own conversation
/// context (§4.10) — the id, phone, and a short tail of history are always
/// injected here regardless of what the model supplied.
fn build_tool_call_args(name: &str, model_args: &Value, input: &NonBookingInput<'_>) -> Value {
    if name == ESCALATE_TO_HUMAN {
        let reason = model_args.get("reason").and_then(Value::as_str).unwrap_or("solicitud del cliente");
        let history: Vec<String> = input
            .state
            .last_k(5)
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect();
        return json!({
            "conversation_id": input.conversation_id,
            "phone": input.state.customer_phone,
            "reason": format!("{reason} | últimos mensajes: {}", history.join(" / ")),
        });
    }
    if name == MANAGE_CUSTOMER {
        let mut args = model_args
            .as_object()
            .cloned()
            .unwrap_or_default();
        args.entry("phone".to_string()).or_insert_with(|| json!(input.state.customer_phone));
        return Value::Object(args);
    }
    model_args.clone()
}

fn summarize_tool_result(name: &str, result: &Value) -> String {
    if name == QUERY_INFO {
        if let Some(faqs) = result.get("faqs").and_then(Value::as_array) {
            return faqs
                .iter()
                .filter_map(|f| f.get("value").and_then(Value::as_str))
                .map(str::to_string)
                .collect::<Vec<_>>()
                .join("\n");
        }
        if let Some(value) = result.get("value") {
            return value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
        }
    }
    if name == SEARCH_SERVICES {
        if let Some(results) = result.get("results").and_then(Value::as_array) {
            return results
                .iter()
                .filter_map(|s| s.get("name").and_then(Value::as_str))
                .map(|n| format!("- {n}"))
                .collect::<Vec<_>>()
                .join("\n");
        }
    }
    result.to_string()
}
