//! Raw event feed produced by an execution engine for one run.
//!
//! Three independent families share one tagged union so that arrival order
//! across families is preserved by construction. Unknown tags deserialize to
//! `Unknown`/`Other` variants instead of failing.

use serde::{Deserialize, Serialize};

use crate::types::ModelMessage;

/// One raw event from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRunEvent {
    /// Control moved to a different agent (typically after a handoff).
    AgentUpdated { agent_name: String },
    /// Low-level generation event from the model response.
    RawResponse { data: ResponseEvent },
    /// Lifecycle event for an item produced by the run.
    RunItem { item: RunItemEvent },
    #[serde(other)]
    Unknown,
}

impl RawRunEvent {
    pub fn agent_updated(agent_name: impl Into<String>) -> Self {
        Self::AgentUpdated {
            agent_name: agent_name.into(),
        }
    }

    pub fn response_started() -> Self {
        Self::RawResponse {
            data: ResponseEvent::ResponseCreated,
        }
    }

    pub fn text_delta(delta: impl Into<String>) -> Self {
        Self::RawResponse {
            data: ResponseEvent::OutputTextDelta {
                delta: delta.into(),
            },
        }
    }

    pub fn response_done() -> Self {
        Self::RawResponse {
            data: ResponseEvent::ResponseCompleted,
        }
    }

    pub fn item(item: RunItemEvent) -> Self {
        Self::RunItem { item }
    }
}

/// Generation events streamed from the model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    ResponseCreated,
    OutputTextDelta { delta: String },
    ResponseCompleted,
    /// Any other provider event (refusals, audio, usage...).
    #[serde(other)]
    Other,
}

/// Run item lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum RunItemEvent {
    ToolCalled {
        agent_name: String,
        call: ToolCallItem,
    },
    ToolOutput {
        agent_name: String,
        call: ToolCallItem,
        #[serde(default)]
        output: serde_json::Value,
    },
    HandoffRequested {
        agent_name: String,
        target_name: String,
    },
    HandoffOccurred {
        source_name: String,
        target_name: String,
    },
    MessageOutputCreated {
        agent_name: String,
        message: ModelMessage,
    },
    ReasoningItemCreated {
        agent_name: String,
        #[serde(default)]
        summary: String,
    },
    #[serde(other)]
    Unknown,
}

/// A tool call as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallItem {
    pub call_id: String,
    pub kind: ToolCallKind,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallItem {
    pub fn function(call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            kind: ToolCallKind::Function { name: name.into() },
            arguments: serde_json::Value::Null,
        }
    }

    pub fn hosted(call_id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            kind: ToolCallKind::Hosted { tool: tool.into() },
            arguments: serde_json::Value::Null,
        }
    }
}

/// Concrete kind of a tool call item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolCallKind {
    /// Function tool (including peer agents exposed as tools).
    Function { name: String },
    /// Provider-hosted tool such as web or file search.
    Hosted { tool: String },
    #[serde(other)]
    Other,
}

/// Name shown for tool kinds that carry no name of their own.
pub const GENERIC_TOOL_NAME: &str = "tool";

impl ToolCallKind {
    /// Name shown to the client for this call.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Function { name } => name,
            Self::Hosted { tool } => tool,
            Self::Other => GENERIC_TOOL_NAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_deserialize_without_error() {
        let event: RawRunEvent =
            serde_json::from_str(r#"{"type":"usage_report","tokens":12}"#).unwrap();
        assert_eq!(event, RawRunEvent::Unknown);

        let event: RawRunEvent = serde_json::from_str(
            r#"{"type":"raw_response","data":{"type":"response.audio.delta"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            RawRunEvent::RawResponse {
                data: ResponseEvent::Other
            }
        );

        let event: RawRunEvent = serde_json::from_str(
            r#"{"type":"run_item","item":{"name":"mcp_approval_requested"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            RawRunEvent::RunItem {
                item: RunItemEvent::Unknown
            }
        );
    }

    #[test]
    fn tool_kind_display_names() {
        assert_eq!(ToolCallItem::function("c1", "lookup").kind.display_name(), "lookup");
        assert_eq!(ToolCallItem::hosted("c2", "web_search").kind.display_name(), "web_search");
        let other: ToolCallKind = serde_json::from_str(r#"{"kind":"computer"}"#).unwrap();
        assert_eq!(other.display_name(), GENERIC_TOOL_NAME);
    }
}
