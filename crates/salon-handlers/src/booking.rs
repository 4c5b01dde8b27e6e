//! Booking Handler (C9, spec.md §4.9): asks the FSM for its prescribed
//! action, executes any tool calls in order, then formats the reply.
//!
//! Two responsibilities the distilled spec states in one sentence each turn
//! out to need real plumbing: the FSM's templates name tools loosely
//! (`get_availability`, `list_services`, ...) with only the arguments the
//! FSM itself knows about, while the executor's tools want fully-shaped,
//! validated input (a resolved service category, a customer phone number,
//! resolved service ids); and a tool's result sometimes changes what the
//! FSM will ask for next (`book` unlocking the `BOOKED` confirmation
//! template), so the handler re-asks for the prescribed action once after
//! running a round of tools.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};

use salon_core::domain::ServiceCategory;
use salon_fsm::{ActionType, BookingFsm, CollectedData, FsmAction, SlotData, ToolCall};
use salon_intent::OpenRouterClient;
use salon_tools::{ToolContext, BOOK, CHECK_AVAILABILITY, FIND_NEXT_AVAILABLE, LIST_STYLISTS, SEARCH_SERVICES};

use crate::error::Result;

/// Conversation-level facts the FSM itself doesn't carry but `book` needs.
pub struct BookingInput<'a> {
    pub ctx: &'a ToolContext,
    pub llm: Option<&'a OpenRouterClient>,
    pub phone: &'a str,
}

pub async fn handle(fsm: &mut BookingFsm, input: &BookingInput<'_>) -> Result<String> {
    let mut template_vars: HashMap<String, Value> = HashMap::new();
    let mut action = fsm.required_action()?;
    let mut previous_calls: Option<Vec<ToolCall>> = None;

    for _ in 0..2 {
        if action.action_type != ActionType::CallToolsSequence {
            break;
        }
        if previous_calls.as_ref() == Some(&action.tool_calls) {
            // Re-running gave the FSM nothing new to act on; stop retrying
            // and present the last round's results directly below.
            break;
        }
        run_tool_round(fsm, &action, input, &mut template_vars).await?;
        previous_calls = Some(action.tool_calls.clone());
        action = fsm.required_action()?;
    }

    if action.action_type == ActionType::CallToolsSequence {
        return Ok(render_tool_listing(&template_vars));
    }

    let guidance = fsm.response_guidance();
    let mut merged = action.template_vars.clone();
    merged.extend(template_vars);
    let rendered_action = FsmAction {
        template_vars: merged,
        ..action
    };
    Ok(salon_format::format(&rendered_action, &guidance, fsm.collected_data(), input.llm).await)
}

async fn run_tool_round(
    fsm: &mut BookingFsm,
    action: &FsmAction,
    input: &BookingInput<'_>,
    template_vars: &mut HashMap<String, Value>,
) -> Result<()> {
    for call in &action.tool_calls {
        let effective = effective_canonical(&call.name);
        let args = translate_args(effective, call, fsm.collected_data(), input).await?;

        match salon_tools::execute(input.ctx, effective, &args).await {
            Ok(result) => {
                apply_tool_result(fsm.collected_data_mut(), effective, &result);
                template_vars.insert(effective.to_string(), result);
            }
            Err(e) if call.required => {
                return Err(crate::error::HandlerError::RequiredToolFailed {
                    tool: effective.to_string(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(tool = effective, error = %e, "optional tool call failed");
                template_vars.insert(effective.to_string(), json!({ "error": e.to_string() }));
            }
        }
    }
    Ok(())
}

/// The FSM's `get_availability` call means "find the next bookable slots
/// for the chosen stylist", which is a multi-day search, not the
/// single-day `check_availability` its name canonicalizes to (that tool
/// needs a `date` the booking flow never supplies at this step).
fn effective_canonical(fsm_name: &str) -> &'static str {
    if fsm_name == "get_availability" {
        return FIND_NEXT_AVAILABLE;
    }
    salon_tools::registry::canonicalize(fsm_name)
}

async fn translate_args(
    effective: &str,
    call: &ToolCall,
    data: &CollectedData,
    input: &BookingInput<'_>,
) -> Result<Value> {
    match effective {
        SEARCH_SERVICES => Ok(json!({ "query": "", "max_results": 50 })),
        LIST_STYLISTS => {
            let category = resolve_category(input.ctx, data).await?;
            Ok(json!({ "category": category.to_string() }))
        }
        FIND_NEXT_AVAILABLE | CHECK_AVAILABILITY => Ok(json!({
            "stylist_id": data.stylist_id,
            "duration_minutes": data.total_duration_minutes(),
        })),
        BOOK => {
            let service_ids = resolve_service_ids(input.ctx, data).await?;
            let (first_name, last_name) = split_name(data);
            Ok(json!({
                "phone": input.phone,
                "first_name": first_name,
                "last_name": last_name,
                "stylist_id": data.stylist_id,
                "start_time": data.slot.as_ref().map(|s| s.start.to_rfc3339()),
                "service_ids": service_ids,
                "duration_minutes": data.total_duration_minutes(),
            }))
        }
        _ => Ok(call
            .args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<String, Value>>()
            .into()),
    }
}

fn split_name(data: &CollectedData) -> (String, Option<String>) {
    let first = data.customer_name.clone().unwrap_or_default();
    (first, data.customer_last_name.clone())
}

async fn resolve_category(ctx: &ToolContext, data: &CollectedData) -> Result<ServiceCategory> {
    let services = salon_db::services::list_active(&ctx.pool).await?;
    let query = data.services.first().map(|s| s.name.as_str()).unwrap_or_default();
    let category = salon_resolve::resolve_for_duration(query, &services)
        .map(|o| o.category)
        .unwrap_or(ServiceCategory::Hairdressing);
    Ok(category)
}

async fn resolve_service_ids(ctx: &ToolContext, data: &CollectedData) -> Result<Vec<String>> {
    let services = salon_db::services::list_active(&ctx.pool).await?;
    let ids: Vec<String> = data
        .services
        .iter()
        .filter_map(|s| salon_resolve::resolve_for_duration(&s.name, &services))
        .map(|o| o.id)
        .collect();
    Ok(ids)
}

/// Writes a tool's result back into `collected_data` when the FSM's own
/// requirement checks (§4.2.2 step 4, slot-time resolution against
/// `slots_shown`) depend on it. Display-only tools (`search_services`,
/// `list_stylists`) leave `collected_data` untouched — the customer's next
/// message, not the tool output, is what advances the flow for those.
fn apply_tool_result(data: &mut CollectedData, effective: &str, result: &Value) {
    match effective {
        BOOK => {
            if let Some(id) = result.get("appointment_id").and_then(Value::as_str) {
                data.appointment_id = Some(id.to_string());
            }
        }
        FIND_NEXT_AVAILABLE | CHECK_AVAILABILITY => {
            let Some(slots) = result.get("slots").and_then(Value::as_array) else {
                return;
            };
            data.slots_shown = slots
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|start| SlotData {
                    start: start.with_timezone(&Utc),
                    stylist_id: data.stylist_id.clone().unwrap_or_default(),
                    stylist_name: data.stylist_name.clone(),
                })
                .collect();
        }
        _ => {}
    }
}

/// A last-resort rendering for the rare case where the FSM still wants
/// another tool round after the bounded retry above gives up — presents
/// whatever was gathered rather than sending an empty reply.
fn render_tool_listing(template_vars: &HashMap<String, Value>) -> String {
    for (tool, result) in template_vars {
        if let Some(services) = result.get("results").and_then(Value::as_array) {
            let names: Vec<String> = services
                .iter()
                .filter_map(|s| s.get("name").and_then(Value::as_str))
                .map(|n| format!("- {n}"))
                .collect();
            if !names.is_empty() {
                return format!("Estos son nuestros servicios:\n{}", names.join("\n"));
            }
        }
        if let Some(slots) = result.get("slots").and_then(Value::as_array) {
            let times: Vec<String> = slots
                .iter()
                .filter_map(Value::as_str)
                .map(|t| format!("- {t}"))
                .collect();
            if !times.is_empty() {
                return format!("Estos son los próximos huecos disponibles:\n{}", times.join("\n"));
            }
        }
        tracing::trace!(tool, "tool listing had nothing displayable");
    }
    "Un momento, estoy consultando la información.".to_string()
}
