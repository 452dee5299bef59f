//! Data-access seams consumed by the orchestrator.
//!
//! Relational persistence of agents, tool servers and conversations lives
//! outside this crate. These traits describe the reads and writes conductor
//! needs; [`memory`] and [`file`] provide implementations for tests, tools
//! and single-node deployments.

pub mod file;
pub mod memory;

pub use file::FileConversationStore;
pub use memory::{AgentCatalog, InMemoryAgentStore, InMemoryConversationStore};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AgentDefinition, AgentId, ConversationId, ConversationSession, ExchangeItem, NewExchangeItem,
    OwnerContext, RemoteToolRef, ToolServer,
};

/// Read access to agent definitions and their edges.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Resolve `slug` for `owner`.
    ///
    /// Implementations may return a definition that belongs to another owner
    /// when slugs resolve through a shared lookup; callers must check
    /// [`AgentDefinition::owner_id`].
    async fn find_by_slug(&self, owner: &OwnerContext, slug: &str)
        -> Result<Option<AgentDefinition>>;

    /// Enabled built-in capability tags in stored order. Tags are free-form.
    async fn list_built_in_capabilities(&self, agent_id: AgentId) -> Result<Vec<String>>;

    /// Remote tool server references in stored order.
    async fn list_remote_tool_refs(&self, agent_id: AgentId) -> Result<Vec<RemoteToolRef>>;

    /// Peer agents usable as callable tools, in stored order.
    async fn list_peer_agent_refs(&self, agent_id: AgentId) -> Result<Vec<AgentDefinition>>;

    /// Handoff targets in stored order.
    async fn list_handoff_targets(&self, agent_id: AgentId) -> Result<Vec<AgentDefinition>>;
}

/// Per-owner registry of remote tool servers.
#[async_trait]
pub trait ToolServerRegistry: Send + Sync {
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ToolServer>>;
}

/// Storage for conversation sessions and their exchange items.
///
/// Items are strictly append-ordered per session. A single
/// [`append_items`](Self::append_items) call must be written as one unit.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_session(&self, owner_id: &str, agent_id: AgentId)
        -> Result<ConversationSession>;

    async fn get_session(&self, id: ConversationId) -> Result<Option<ConversationSession>>;

    /// Append items and advance the session's `updated_at`.
    async fn append_items(&self, id: ConversationId, items: Vec<NewExchangeItem>) -> Result<()>;

    /// Items oldest-first; with `limit`, only the most recent `limit` items.
    async fn list_items(&self, id: ConversationId, limit: Option<usize>)
        -> Result<Vec<ExchangeItem>>;

    /// Remove and return the most recent item.
    async fn pop_last(&self, id: ConversationId) -> Result<Option<ExchangeItem>>;

    /// Delete every item in the session.
    async fn clear(&self, id: ConversationId) -> Result<()>;
}
