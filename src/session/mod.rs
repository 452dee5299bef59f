//! Conversation history bridged to and from the run-input format.

use std::sync::Arc;

use crate::error::{ConductorError, Result};
use crate::store::ConversationStore;
use crate::types::{
    AgentId, ContentPart, ConversationId, ConversationSession, ExchangeItem, ExchangeRole,
    ModelMessage, NewExchangeItem, Role,
};

/// History access scoped to one conversation session.
///
/// Every item is stored with two representations: a display projection for
/// listing and search, and the full [`ModelMessage`] as a JSON payload. Only
/// the payload is used to rebuild run input.
#[derive(Clone)]
pub struct ConversationSessionAdapter {
    store: Arc<dyn ConversationStore>,
    session_id: ConversationId,
}

impl ConversationSessionAdapter {
    pub fn new(store: Arc<dyn ConversationStore>, session_id: ConversationId) -> Self {
        Self { store, session_id }
    }

    pub fn session_id(&self) -> ConversationId {
        self.session_id
    }

    /// The session row.
    pub async fn session(&self) -> Result<ConversationSession> {
        self.store
            .get_session(self.session_id)
            .await?
            .ok_or_else(|| ConductorError::NotFound(format!("conversation {}", self.session_id)))
    }

    /// Prior messages in run-input form, oldest first.
    ///
    /// With `limit`, only the most recent `limit` items are returned. Fails
    /// with [`ConductorError::History`] if any item in the window lacks a
    /// structured payload.
    pub async fn get_context(&self, limit: Option<usize>) -> Result<Vec<ModelMessage>> {
        let items = self.store.list_items(self.session_id, limit).await?;
        items.iter().map(restore_message).collect()
    }

    /// Persist `messages` in order as one write.
    ///
    /// `agent_id` attributes the items to the sub-agent that produced them.
    pub async fn append(&self, messages: &[ModelMessage], agent_id: Option<AgentId>) -> Result<()> {
        let items = messages
            .iter()
            .map(|message| to_item(message, agent_id))
            .collect::<Result<Vec<_>>>()?;
        self.write(items).await
    }

    /// Persist a user message and the reply to it as one write, attributing
    /// only the reply to `agent_id`.
    pub async fn append_turn(
        &self,
        user: &ModelMessage,
        reply: &ModelMessage,
        agent_id: Option<AgentId>,
    ) -> Result<()> {
        self.write(vec![to_item(user, None)?, to_item(reply, agent_id)?])
            .await
    }

    async fn write(&self, items: Vec<NewExchangeItem>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            conversation_id = %self.session_id,
            count = items.len(),
            "appending exchange items"
        );
        self.store.append_items(self.session_id, items).await
    }

    /// Remove and return the most recent item, or `None` when empty.
    pub async fn pop_last(&self) -> Result<Option<ExchangeItem>> {
        self.store.pop_last(self.session_id).await
    }

    /// Delete every item in the session.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear(self.session_id).await
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.store.list_items(self.session_id, None).await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

fn to_item(message: &ModelMessage, agent_id: Option<AgentId>) -> Result<NewExchangeItem> {
    Ok(NewExchangeItem {
        role: exchange_role(message.role),
        display_text: display_text(message),
        payload: Some(serde_json::to_value(message)?),
        agent_id,
    })
}

/// Rebuild the run-format message stored on `item`.
pub fn restore_message(item: &ExchangeItem) -> Result<ModelMessage> {
    let payload = item.payload.as_ref().ok_or_else(|| {
        ConductorError::History(format!(
            "item {} has no structured payload and cannot be replayed",
            item.seq
        ))
    })?;
    serde_json::from_value(payload.clone())
        .map_err(|e| ConductorError::History(format!("item {}: {e}", item.seq)))
}

fn exchange_role(role: Role) -> ExchangeRole {
    match role {
        Role::System => ExchangeRole::System,
        Role::User => ExchangeRole::User,
        Role::Assistant | Role::Tool => ExchangeRole::Assistant,
    }
}

/// Text shown in listings: the joined text parts, or a label for the first
/// non-text part.
pub fn display_text(message: &ModelMessage) -> String {
    let text = message.text();
    if !text.is_empty() {
        return text;
    }
    message
        .content
        .iter()
        .find_map(|part| match part {
            ContentPart::Text { .. } => None,
            ContentPart::ToolCall(call) => Some(format!("Tool call: {}", call.name)),
            ContentPart::ToolResult(result) => {
                Some(format!("Tool result: {}", result.tool_call_id))
            }
            ContentPart::Handoff { target, .. } => Some(format!("Handoff: {target}")),
        })
        .unwrap_or_default()
}
