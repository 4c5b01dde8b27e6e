//! The fixed tool table (§4.6). Names here are canonical; `canonicalize`
//! also accepts the literal `ToolCall` names the booking FSM's templates
//! emit, which predate this registry and were never renamed to match.

use serde_json::{json, Value};

pub const SEARCH_SERVICES: &str = "search_services";
pub const LIST_STYLISTS: &str = "list_stylists";
pub const QUERY_INFO: &str = "query_info";
pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const FIND_NEXT_AVAILABLE: &str = "find_next_available";
pub const BOOK: &str = "book";
pub const MANAGE_CUSTOMER: &str = "manage_customer";
pub const ESCALATE_TO_HUMAN: &str = "escalate_to_human";

/// Read-only tools the non-booking handler may bind to the LLM (§4.10).
/// `manage_customer` and `escalate_to_human` are included even though one
/// mutates and one has side effects — "read-only" there means "safe for the
/// LLM to invoke unprompted", not "no database write".
pub const NON_BOOKING_TOOLSET: &[&str] = &[QUERY_INFO, SEARCH_SERVICES, MANAGE_CUSTOMER, ESCALATE_TO_HUMAN];

/// Map a `ToolCall::name` to its canonical registry name. The booking
/// templates were authored before this table and use their own literal
/// strings for three of the eight tools; this keeps them working without
/// editing the templates.
pub fn canonicalize(name: &str) -> &str {
    match name {
        "list_services" => SEARCH_SERVICES,
        "list_available_stylists" => LIST_STYLISTS,
        "get_availability" => CHECK_AVAILABILITY,
        other => other,
    }
}

/// JSON-Schema tool definitions for the subset an LLM can choose to call
/// (§4.10). Shaped like an OpenAI/Anthropic `tools` array entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub fn definitions(names: &[&str]) -> Vec<ToolSpec> {
    names.iter().filter_map(|n| definition(n)).collect()
}

fn definition(name: &str) -> Option<ToolSpec> {
    let spec = match name {
        QUERY_INFO => ToolSpec {
            name: QUERY_INFO.to_string(),
            description: "Look up salon hours, FAQs, policies, or location information by key."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "the policy or FAQ key to look up"}
                },
                "required": ["key"]
            }),
        },
        SEARCH_SERVICES => ToolSpec {
            name: SEARCH_SERVICES.to_string(),
            description: "Fuzzy-search the service catalog by free-text query.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer", "minimum": 1, "maximum": 20}
                },
                "required": ["query"]
            }),
        },
        MANAGE_CUSTOMER => ToolSpec {
            name: MANAGE_CUSTOMER.to_string(),
            description: "Create or update the customer record for this conversation's phone number."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "phone": {"type": "string"},
                    "first_name": {"type": "string"},
                    "last_name": {"type": "string"}
                },
                "required": ["phone", "first_name"]
            }),
        },
        ESCALATE_TO_HUMAN => ToolSpec {
            name: ESCALATE_TO_HUMAN.to_string(),
            description: "Hand the conversation off to a human member of staff.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string"}
                },
                "required": []
            }),
        },
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsm_literal_names_canonicalize() {
        assert_eq!(canonicalize("list_services"), SEARCH_SERVICES);
        assert_eq!(canonicalize("list_available_stylists"), LIST_STYLISTS);
        assert_eq!(canonicalize("get_availability"), CHECK_AVAILABILITY);
        assert_eq!(canonicalize("book"), BOOK);
    }

    #[test]
    fn non_booking_toolset_has_definitions() {
        let defs = definitions(NON_BOOKING_TOOLSET);
        assert_eq!(defs.len(), NON_BOOKING_TOOLSET.len());
    }
}
