use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Assistant,
    System,
}

/// A discrete, named action the generation engine proposes on the guest's
/// behalf. Proposals only ever exist inside the assistant turn that emitted
/// them; they are never persisted independently.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposedToolCall {
    pub name: String,
    pub arguments: Value,
    pub call_id: String,
}

impl ProposedToolCall {
    pub fn new(name: impl Into<String>, arguments: Value, call_id: impl Into<String>) -> Self {
        Self { name: name.into(), arguments, call_id: call_id.into() }
    }

    /// Blank-named proposals are dropped before they reach the gate.
    pub fn has_executable_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub success: bool,
    pub payload: Value,
    pub error_message: Option<String>,
}

impl ToolCallResult {
    pub fn succeeded(call_id: impl Into<String>, payload: Value) -> Self {
        Self { call_id: call_id.into(), success: true, payload, error_message: None }
    }

    pub fn failed(call_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            payload: Value::Null,
            error_message: Some(error_message.into()),
        }
    }
}

/// One entry in the append-only run history. Ordering is significant:
/// results of a tool batch are appended in original proposal order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ProposedToolCall>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn guest(content: impl Into<String>) -> Self {
        Self::message(Role::Guest, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::message(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::message(Role::System, content)
    }

    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ProposedToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: calls,
            timestamp: Utc::now(),
        }
    }

    /// Renders a resolved tool batch as a single system turn. Callers are
    /// responsible for passing results in original proposal order.
    pub fn tool_results(results: &[ToolCallResult]) -> Self {
        let body = serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string());
        Self::message(Role::System, format!("tool_results: {body}"))
    }

    fn message(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), tool_calls: Vec::new(), timestamp: Utc::now() }
    }
}
