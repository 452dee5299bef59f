//! In-memory store implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ConductorError, Result};
use crate::types::{
    AgentDefinition, AgentId, ConversationId, ConversationSession, ExchangeItem, NewExchangeItem,
    OwnerContext, OwnerId, RemoteToolRef, ToolServer,
};

use super::{AgentStore, ConversationStore, ToolServerRegistry};

/// Serializable snapshot of agents, their edges and tool servers.
///
/// ```toml
/// [[agents]]
/// id = 1
/// owner_id = "u1"
/// slug = "triage"
/// name = "Triage"
/// instructions = "Route the user."
/// capabilities = ["web_search"]
/// remote_tools = ["crm"]
/// peer_tools = [2]
/// handoffs = [3]
///
/// [[tool_servers]]
/// owner_id = "u1"
/// id = "crm"
/// url = "https://crm.example.com/mcp"
/// label = "CRM"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentCatalog {
    #[serde(default)]
    pub agents: Vec<CatalogAgent>,
    #[serde(default)]
    pub tool_servers: Vec<CatalogToolServer>,
}

/// An agent entry in an [`AgentCatalog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAgent {
    #[serde(flatten)]
    pub definition: AgentDefinition,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub remote_tools: Vec<String>,
    #[serde(default)]
    pub peer_tools: Vec<AgentId>,
    #[serde(default)]
    pub handoffs: Vec<AgentId>,
}

/// A tool server entry in an [`AgentCatalog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogToolServer {
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub server: ToolServer,
}

#[derive(Debug, Default)]
struct AgentTables {
    agents: Vec<AgentDefinition>,
    capabilities: HashMap<AgentId, Vec<String>>,
    remote_tools: HashMap<AgentId, Vec<RemoteToolRef>>,
    peer_tools: HashMap<AgentId, Vec<AgentId>>,
    handoffs: HashMap<AgentId, Vec<AgentId>>,
    tool_servers: HashMap<OwnerId, Vec<ToolServer>>,
}

impl AgentTables {
    fn by_id(&self, id: AgentId) -> Option<&AgentDefinition> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    fn resolve_ids(&self, from: AgentId, ids: Option<&Vec<AgentId>>) -> Vec<AgentDefinition> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| {
                let found = self.by_id(*id).cloned();
                if found.is_none() {
                    tracing::warn!(agent_id = from, target_id = *id, "dangling agent reference");
                }
                found
            })
            .collect()
    }
}

/// Agent store and tool server registry backed by process memory.
///
/// Edits are visible to the next read, which makes it suitable for
/// exercising the "no caching across turns" behaviour.
#[derive(Debug, Default)]
pub struct InMemoryAgentStore {
    tables: RwLock<AgentTables>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every agent, edge and tool server from a catalog.
    pub async fn from_catalog(catalog: AgentCatalog) -> Result<Self> {
        let store = Self::new();
        for entry in &catalog.agents {
            store.add_agent(entry.definition.clone()).await?;
        }
        for entry in catalog.agents {
            let id = entry.definition.id;
            for tag in entry.capabilities {
                store.enable_capability(id, tag).await;
            }
            for server_id in entry.remote_tools {
                store.add_remote_tool(id, server_id).await;
            }
            for peer in entry.peer_tools {
                store.add_peer_tool(id, peer).await;
            }
            for target in entry.handoffs {
                store.add_handoff(id, target).await;
            }
        }
        for entry in catalog.tool_servers {
            store.add_tool_server(entry.owner_id, entry.server).await;
        }
        Ok(store)
    }

    /// Parse a TOML catalog.
    pub async fn from_toml(raw: &str) -> Result<Self> {
        let catalog: AgentCatalog = toml::from_str(raw)
            .map_err(|e| ConductorError::Configuration(format!("agent catalog: {e}")))?;
        Self::from_catalog(catalog).await
    }

    /// Insert an agent. Slugs must be unique per owner and ids globally.
    pub async fn add_agent(&self, definition: AgentDefinition) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.by_id(definition.id).is_some() {
            return Err(ConductorError::Validation(format!(
                "agent id {} already exists",
                definition.id
            )));
        }
        if tables
            .agents
            .iter()
            .any(|a| a.owner_id == definition.owner_id && a.slug == definition.slug)
        {
            return Err(ConductorError::Validation(format!(
                "slug '{}' already used by owner '{}'",
                definition.slug, definition.owner_id
            )));
        }
        tables.agents.push(definition);
        Ok(())
    }

    /// Replace the stored instructions of an agent.
    pub async fn set_instructions(&self, agent_id: AgentId, instructions: impl Into<String>) {
        let mut tables = self.tables.write().await;
        if let Some(agent) = tables.agents.iter_mut().find(|a| a.id == agent_id) {
            agent.instructions = instructions.into();
        }
    }

    pub async fn enable_capability(&self, agent_id: AgentId, tag: impl Into<String>) {
        let mut tables = self.tables.write().await;
        tables.capabilities.entry(agent_id).or_default().push(tag.into());
    }

    pub async fn add_remote_tool(&self, agent_id: AgentId, server_id: impl Into<String>) {
        let mut tables = self.tables.write().await;
        tables
            .remote_tools
            .entry(agent_id)
            .or_default()
            .push(RemoteToolRef {
                server_id: server_id.into(),
            });
    }

    pub async fn add_peer_tool(&self, agent_id: AgentId, peer_id: AgentId) {
        let mut tables = self.tables.write().await;
        tables.peer_tools.entry(agent_id).or_default().push(peer_id);
    }

    pub async fn add_handoff(&self, agent_id: AgentId, target_id: AgentId) {
        let mut tables = self.tables.write().await;
        tables.handoffs.entry(agent_id).or_default().push(target_id);
    }

    pub async fn remove_handoff(&self, agent_id: AgentId, target_id: AgentId) {
        let mut tables = self.tables.write().await;
        if let Some(targets) = tables.handoffs.get_mut(&agent_id) {
            targets.retain(|id| *id != target_id);
        }
    }

    pub async fn add_tool_server(&self, owner_id: impl Into<OwnerId>, server: ToolServer) {
        let mut tables = self.tables.write().await;
        tables
            .tool_servers
            .entry(owner_id.into())
            .or_default()
            .push(server);
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    /// Prefers the owner's own agent; otherwise returns any agent with the
    /// slug so the caller can tell "not yours" from "does not exist".
    async fn find_by_slug(
        &self,
        owner: &OwnerContext,
        slug: &str,
    ) -> Result<Option<AgentDefinition>> {
        let tables = self.tables.read().await;
        let own = tables
            .agents
            .iter()
            .find(|a| a.slug == slug && owner.owns(&a.owner_id));
        Ok(own
            .or_else(|| tables.agents.iter().find(|a| a.slug == slug))
            .cloned())
    }

    async fn list_built_in_capabilities(&self, agent_id: AgentId) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables.capabilities.get(&agent_id).cloned().unwrap_or_default())
    }

    async fn list_remote_tool_refs(&self, agent_id: AgentId) -> Result<Vec<RemoteToolRef>> {
        let tables = self.tables.read().await;
        Ok(tables.remote_tools.get(&agent_id).cloned().unwrap_or_default())
    }

    async fn list_peer_agent_refs(&self, agent_id: AgentId) -> Result<Vec<AgentDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables.resolve_ids(agent_id, tables.peer_tools.get(&agent_id)))
    }

    async fn list_handoff_targets(&self, agent_id: AgentId) -> Result<Vec<AgentDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables.resolve_ids(agent_id, tables.handoffs.get(&agent_id)))
    }
}

#[async_trait]
impl ToolServerRegistry for InMemoryAgentStore {
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ToolServer>> {
        let tables = self.tables.read().await;
        Ok(tables.tool_servers.get(owner_id).cloned().unwrap_or_default())
    }
}

/// Session plus its items, as held by the conversation stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub session: ConversationSession,
    pub items: Vec<ExchangeItem>,
    pub next_seq: u64,
}

impl SessionRecord {
    pub fn new(session: ConversationSession) -> Self {
        Self {
            session,
            items: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn append(&mut self, items: Vec<NewExchangeItem>) {
        for item in items {
            self.items.push(ExchangeItem::from_new(self.next_seq, item));
            self.next_seq += 1;
        }
        self.session.updated_at = Utc::now();
    }

    pub fn window(&self, limit: Option<usize>) -> Vec<ExchangeItem> {
        let start = match limit {
            Some(limit) => self.items.len().saturating_sub(limit),
            None => 0,
        };
        self.items[start..].to_vec()
    }
}

fn unknown_session(id: ConversationId) -> ConductorError {
    ConductorError::NotFound(format!("conversation {id}"))
}

/// Conversation store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<ConversationId, SessionRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions held, empty ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_session(
        &self,
        owner_id: &str,
        agent_id: AgentId,
    ) -> Result<ConversationSession> {
        let session = ConversationSession::new(owner_id, agent_id);
        self.sessions
            .write()
            .await
            .insert(session.id, SessionRecord::new(session.clone()));
        Ok(session)
    }

    async fn get_session(&self, id: ConversationId) -> Result<Option<ConversationSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .map(|record| record.session.clone()))
    }

    async fn append_items(&self, id: ConversationId, items: Vec<NewExchangeItem>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(&id).ok_or_else(|| unknown_session(id))?;
        record.append(items);
        Ok(())
    }

    async fn list_items(
        &self,
        id: ConversationId,
        limit: Option<usize>,
    ) -> Result<Vec<ExchangeItem>> {
        let sessions = self.sessions.read().await;
        let record = sessions.get(&id).ok_or_else(|| unknown_session(id))?;
        Ok(record.window(limit))
    }

    async fn pop_last(&self, id: ConversationId) -> Result<Option<ExchangeItem>> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(&id).ok_or_else(|| unknown_session(id))?;
        Ok(record.items.pop())
    }

    async fn clear(&self, id: ConversationId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(&id).ok_or_else(|| unknown_session(id))?;
        record.items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExchangeRole;

    fn agent(id: AgentId, owner: &str, slug: &str) -> AgentDefinition {
        AgentDefinition {
            id,
            owner_id: owner.into(),
            slug: slug.into(),
            name: slug.to_uppercase(),
            purpose: String::new(),
            instructions: String::new(),
        }
    }

    fn text_item(text: &str) -> NewExchangeItem {
        NewExchangeItem {
            role: ExchangeRole::User,
            display_text: text.into(),
            payload: None,
            agent_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_slug_per_owner_is_rejected() {
        let store = InMemoryAgentStore::new();
        store.add_agent(agent(1, "u1", "helper")).await.unwrap();
        store.add_agent(agent(2, "u2", "helper")).await.unwrap();

        let err = store.add_agent(agent(3, "u1", "helper")).await.unwrap_err();
        assert!(matches!(err, ConductorError::Validation(_)));
    }

    #[tokio::test]
    async fn find_by_slug_prefers_own_agent() {
        let store = InMemoryAgentStore::new();
        store.add_agent(agent(1, "u2", "helper")).await.unwrap();
        store.add_agent(agent(2, "u1", "helper")).await.unwrap();

        let found = store
            .find_by_slug(&OwnerContext::new("u1"), "helper")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 2);

        let foreign = store
            .find_by_slug(&OwnerContext::new("u3"), "helper")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(foreign.owner_id, "u2");
    }

    #[tokio::test]
    async fn edges_keep_stored_order_and_skip_dangling_ids() {
        let store = InMemoryAgentStore::new();
        store.add_agent(agent(1, "u1", "a")).await.unwrap();
        store.add_agent(agent(2, "u1", "b")).await.unwrap();
        store.add_agent(agent(3, "u1", "c")).await.unwrap();
        store.add_handoff(1, 3).await;
        store.add_handoff(1, 99).await;
        store.add_handoff(1, 2).await;

        let targets = store.list_handoff_targets(1).await.unwrap();
        let slugs: Vec<&str> = targets.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn catalog_loads_from_toml() {
        let store = InMemoryAgentStore::from_toml(
            r#"
            [[agents]]
            id = 1
            owner_id = "u1"
            slug = "triage"
            name = "Triage"
            capabilities = ["web_search"]
            handoffs = [2]

            [[agents]]
            id = 2
            owner_id = "u1"
            slug = "billing"
            name = "Billing"

            [[tool_servers]]
            owner_id = "u1"
            id = "crm"
            url = "https://crm.example.com"
            label = "CRM"
            "#,
        )
        .await
        .unwrap();

        assert_eq!(
            store.list_built_in_capabilities(1).await.unwrap(),
            vec!["web_search".to_string()]
        );
        assert_eq!(store.list_handoff_targets(1).await.unwrap()[0].slug, "billing");
        assert_eq!(store.list_for_owner("u1").await.unwrap()[0].id, "crm");
        assert!(store.list_for_owner("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn conversation_items_are_sequenced_and_windowed() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session("u1", 1).await.unwrap();

        store
            .append_items(session.id, vec![text_item("one"), text_item("two")])
            .await
            .unwrap();
        store
            .append_items(session.id, vec![text_item("three")])
            .await
            .unwrap();

        let all = store.list_items(session.id, None).await.unwrap();
        let seqs: Vec<u64> = all.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let recent = store.list_items(session.id, Some(2)).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|i| i.display_text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert!(updated.updated_at >= session.updated_at);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = InMemoryConversationStore::new();
        let err = store
            .append_items(uuid::Uuid::new_v4(), vec![text_item("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, ConductorError::NotFound(_)));
    }
}
