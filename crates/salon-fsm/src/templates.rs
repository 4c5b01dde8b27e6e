//! The seven per-state action builders: given the current `CollectedData`,
//! decide whether the orchestrator must run a tool or render a template,
//! and produce the exact template string/vars for the latter.
//!
//! Templates are `minijinja` source, matching the salon's existing Spanish
//! copy — loops over `services`/`slots` use `{% for %}`/`loop.index`,
//! conditionals use `{% if %}`. The FSM owns the copy; the Response
//! Formatter (C7) only renders it and, optionally, asks the LLM to restyle
//! the result without changing its facts (§4.8).

use crate::action::{ActionError, FsmAction, ToolCall};
use crate::data::CollectedData;
use serde_json::json;
use std::collections::HashMap;

fn vars(pairs: Vec<(&str, serde_json::Value)>) -> HashMap<String, serde_json::Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub fn action_idle() -> Result<FsmAction, ActionError> {
    FsmAction::response(
        "¡Hola! Soy el asistente de citas del salón. Puedo ayudarte a reservar \
         una cita, consultar tus citas o resolver dudas sobre nuestros servicios. \
         ¿Qué te gustaría hacer?",
        HashMap::new(),
        true,
    )
}

pub fn action_service_selection(data: &CollectedData) -> Result<FsmAction, ActionError> {
    if data.services.is_empty() {
        return FsmAction::tools(vec![ToolCall::new("list_services", HashMap::new())]);
    }
    FsmAction::response(
        "Has seleccionado:\n\
         {% for s in services %}- {{ s.name }}{% if s.duration_minutes %} \
         ({{ s.duration_minutes }} min){% endif %}\n{% endfor %}\
         {% if services|length > 1 %}¿Confirmas estos servicios?\
         {% else %}¿Confirmas este servicio?{% endif %}",
        vars(vec![("services", json!(data.services))]),
        false,
    )
}

pub fn action_stylist_selection(data: &CollectedData) -> Result<FsmAction, ActionError> {
    let service_names: Vec<&str> = data.service_names();
    FsmAction::tools(vec![ToolCall::new(
        "list_available_stylists",
        vars(vec![("service_names", json!(service_names))]),
    )])
}

pub fn action_slot_selection(data: &CollectedData) -> Result<FsmAction, ActionError> {
    if let Some(pending) = &data.pending_slot {
        let current = data.stylist_name.as_deref().unwrap_or("el estilista actual");
        let requested = pending
            .stylist_name
            .as_deref()
            .unwrap_or("el estilista de ese hueco");
        let msg = format!(
            "El hueco que elegiste es con {requested}, pero habías seleccionado a \
             {current}. ¿Quieres cambiar a {requested} para esa hora, o prefieres \
             ver otros huecos con {current}?"
        );
        return FsmAction::response(msg, HashMap::new(), false);
    }
    FsmAction::tools(vec![ToolCall::new(
        "get_availability",
        vars(vec![
            ("stylist_id", json!(data.stylist_id)),
            (
                "total_duration_minutes",
                json!(data
                    .services
                    .iter()
                    .filter_map(|s| s.duration_minutes)
                    .sum::<i64>()),
            ),
        ]),
    )])
}

pub fn action_customer_data(data: &CollectedData) -> Result<FsmAction, ActionError> {
    if data.customer_name.is_some() && !data.name_confirmed {
        return FsmAction::response(
            "Veo que tenemos el nombre {{ customer_name }}{% if customer_last_name %} \
             {{ customer_last_name }}{% endif %} en tus datos. ¿Reservo con ese nombre?",
            vars(vec![
                ("customer_name", json!(data.customer_name)),
                ("customer_last_name", json!(data.customer_last_name)),
            ]),
            false,
        );
    }
    if data.customer_name.is_none() {
        return FsmAction::response(
            "¿A nombre de quién hago la reserva?",
            HashMap::new(),
            false,
        );
    }
    if !data.notes_asked {
        return FsmAction::response(
            "¿Quieres añadir alguna nota para el estilista (alergias, preferencias, etc.)? \
             Si no, dime que no hace falta.",
            HashMap::new(),
            false,
        );
    }
    FsmAction::response(
        "Perfecto, {{ customer_name }}. ¿Confirmamos la reserva?",
        vars(vec![("customer_name", json!(data.customer_name))]),
        false,
    )
}

pub fn action_confirmation(data: &CollectedData) -> Result<FsmAction, ActionError> {
    FsmAction::response(
        "Resumen de tu cita:\n\
         {% for s in services %}- {{ s.name }}\n{% endfor %}\
         Estilista: {{ stylist_name }}\n\
         Fecha: {{ slot_start }}\n\
         A nombre de: {{ customer_name }}{% if customer_last_name %} \
         {{ customer_last_name }}{% endif %}\n\
         {% if notes %}Notas: {{ notes }}\n{% endif %}\
         ¿Confirmas la reserva?",
        vars(vec![
            ("services", json!(data.services)),
            ("stylist_name", json!(data.stylist_name)),
            (
                "slot_start",
                json!(data.slot.as_ref().map(|s| s.start.to_rfc3339())),
            ),
            ("customer_name", json!(data.customer_name)),
            ("customer_last_name", json!(data.customer_last_name)),
            ("notes", json!(data.notes)),
        ]),
        false,
    )
}

pub fn action_booked(data: &CollectedData) -> Result<FsmAction, ActionError> {
    if data.appointment_id.is_none() {
        return FsmAction::tools(vec![ToolCall::new(
            "book",
            vars(vec![
                ("stylist_id", json!(data.stylist_id)),
                ("customer_name", json!(data.customer_name)),
                (
                    "slot_start",
                    json!(data.slot.as_ref().map(|s| s.start.to_rfc3339())),
                ),
                ("service_names", json!(data.service_names())),
                ("notes", json!(data.notes)),
            ]),
        )]);
    }
    FsmAction::response(
        "¡Listo, {{ customer_name }}! Tu cita está confirmada para el {{ slot_start }} \
         con {{ stylist_name }}. Te avisaremos antes de la cita.",
        vars(vec![
            ("customer_name", json!(data.customer_name)),
            (
                "slot_start",
                json!(data.slot.as_ref().map(|s| s.start.to_rfc3339())),
            ),
            ("stylist_name", json!(data.stylist_name)),
        ]),
        true,
    )
}
