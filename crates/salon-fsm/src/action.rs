use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("CALL_TOOLS_SEQUENCE action requires at least one tool call")]
    MissingToolCalls,
    #[error("GENERATE_RESPONSE action requires a response_template")]
    MissingTemplate,
    #[error("tool_calls must be empty for a {0:?} action")]
    UnexpectedToolCalls(ActionType),
}

/// What the orchestrator must do in response to a transition: run the fixed
/// tool sequence the FSM prescribes, render a template, or do nothing (the
/// turn was already fully handled, e.g. an escalation handoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CallToolsSequence,
    GenerateResponse,
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: HashMap<String, serde_json::Value>,
    pub required: bool,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: HashMap<String, serde_json::Value>) -> Self {
        Self { name: name.into(), args, required: true }
    }

    pub fn optional(name: impl Into<String>, args: HashMap<String, serde_json::Value>) -> Self {
        Self { name: name.into(), args, required: false }
    }
}

/// The single thing `BookingFsm::transition` hands back alongside the new
/// state: what to execute, and/or what to tell the user. Constructed only
/// through the associated functions below so the three shape invariants
/// (§ tool sequence non-empty, template present, no stray tool calls on a
/// non-tool action) can never be violated at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsmAction {
    pub action_type: ActionType,
    pub tool_calls: Vec<ToolCall>,
    pub response_template: Option<String>,
    pub template_vars: HashMap<String, serde_json::Value>,
    pub allow_llm_creativity: bool,
}

impl FsmAction {
    pub fn tools(calls: Vec<ToolCall>) -> Result<Self, ActionError> {
        if calls.is_empty() {
            return Err(ActionError::MissingToolCalls);
        }
        Ok(Self {
            action_type: ActionType::CallToolsSequence,
            tool_calls: calls,
            response_template: None,
            template_vars: HashMap::new(),
            allow_llm_creativity: false,
        })
    }

    pub fn response(
        template: impl Into<String>,
        vars: HashMap<String, serde_json::Value>,
        allow_llm_creativity: bool,
    ) -> Result<Self, ActionError> {
        Ok(Self {
            action_type: ActionType::GenerateResponse,
            tool_calls: Vec::new(),
            response_template: Some(template.into()),
            template_vars: vars,
            allow_llm_creativity,
        })
    }

    pub fn none() -> Self {
        Self {
            action_type: ActionType::NoAction,
            tool_calls: Vec::new(),
            response_template: None,
            template_vars: HashMap::new(),
            allow_llm_creativity: false,
        }
    }

    /// Re-validates the three shape invariants. Used when deserializing an
    /// action recorded by a prior process (the checkpoint store round-trip).
    pub fn validate(&self) -> Result<(), ActionError> {
        match self.action_type {
            ActionType::CallToolsSequence if self.tool_calls.is_empty() => {
                Err(ActionError::MissingToolCalls)
            }
            ActionType::GenerateResponse if self.response_template.is_none() => {
                Err(ActionError::MissingTemplate)
            }
            ActionType::NoAction | ActionType::GenerateResponse
                if !self.tool_calls.is_empty() =>
            {
                Err(ActionError::UnexpectedToolCalls(self.action_type))
            }
            _ => Ok(()),
        }
    }
}

/// Hints the Response Formatter (C7) uses to keep the LLM creative pass
/// from drifting off the FSM's prescribed content (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseGuidance {
    pub must_show: Vec<String>,
    pub must_ask: Vec<String>,
    pub forbidden: Vec<String>,
    pub context_hint: String,
    pub required_tool_call: Option<String>,
}
