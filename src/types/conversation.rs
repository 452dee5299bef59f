//! Persisted conversation sessions and exchange items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::{AgentId, OwnerId};

/// Conversation session identifier.
pub type ConversationId = Uuid;

/// A persisted conversation between one owner and one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: ConversationId,
    pub owner_id: OwnerId,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(owner_id: impl Into<OwnerId>, agent_id: AgentId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            agent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Display role of a stored exchange item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    User,
    Assistant,
    System,
}

/// An item about to be persisted; the store assigns order and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExchangeItem {
    pub role: ExchangeRole,
    /// Projection used for listing and search only.
    pub display_text: String,
    /// Full run-format representation, opaque outside the session adapter
    /// and the execution engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Sub-agent that produced the item (relevant after a handoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

/// A persisted exchange item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeItem {
    /// Creation order within the session, starting at 1.
    pub seq: u64,
    pub role: ExchangeRole,
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub created_at: DateTime<Utc>,
}

impl ExchangeItem {
    pub fn from_new(seq: u64, item: NewExchangeItem) -> Self {
        Self {
            seq,
            role: item.role,
            display_text: item.display_text,
            payload: item.payload,
            agent_id: item.agent_id,
            created_at: Utc::now(),
        }
    }
}
