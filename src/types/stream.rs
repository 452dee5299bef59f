//! Client-facing stream events and their wire frames.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ErrorCode;

use super::conversation::ConversationId;

/// Progress of a tool invocation as reported to the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolStatus {
    Executing,
    Completed,
}

/// Phase of a handoff as reported to the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HandoffStatus {
    Requested,
    Completed,
}

/// One normalized unit of the live run protocol.
///
/// Only produced while a turn is active; never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Always first, so the client can correlate the conversation even if
    /// the run later fails.
    Initialized { conversation_id: ConversationId },
    Started,
    TextDelta { text: String },
    ToolInvocation {
        tool_name: String,
        agent_name: String,
        status: ToolStatus,
    },
    HandoffRequested { target_name: String },
    HandoffCompleted { target_name: String },
    AgentSwitched { agent_name: String },
    Stopped,
    Error { message: String, code: ErrorCode },
    /// Terminal marker for a successful turn.
    Done,
}

impl StreamEvent {
    /// Whether this event closes the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Convert to the serialized wire frame.
    pub fn to_frame(&self) -> StreamFrame {
        match self {
            Self::Initialized { conversation_id } => StreamFrame::Init {
                conversation_id: *conversation_id,
            },
            Self::Started => StreamFrame::Started,
            Self::TextDelta { text } => StreamFrame::Text {
                content: text.clone(),
            },
            Self::ToolInvocation {
                tool_name,
                agent_name,
                status,
            } => StreamFrame::ToolCall {
                name: tool_name.clone(),
                agent: agent_name.clone(),
                status: *status,
            },
            Self::HandoffRequested { target_name } => StreamFrame::Handoff {
                target: target_name.clone(),
                status: HandoffStatus::Requested,
            },
            Self::HandoffCompleted { target_name } => StreamFrame::Handoff {
                target: target_name.clone(),
                status: HandoffStatus::Completed,
            },
            Self::AgentSwitched { agent_name } => StreamFrame::AgentUpdate {
                agent: agent_name.clone(),
            },
            Self::Stopped => StreamFrame::Stopped,
            Self::Error { message, code } => StreamFrame::Error {
                message: message.clone(),
                code: *code,
            },
            Self::Done => StreamFrame::Done,
        }
    }
}

/// Wire representation: one JSON object per frame, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Init {
        conversation_id: ConversationId,
    },
    Started,
    Text {
        content: String,
    },
    ToolCall {
        name: String,
        agent: String,
        status: ToolStatus,
    },
    AgentUpdate {
        agent: String,
    },
    Handoff {
        target: String,
        status: HandoffStatus,
    },
    Stopped,
    Error {
        message: String,
        code: ErrorCode,
    },
    Done,
}

impl StreamFrame {
    /// Serialize to a single-line JSON frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
