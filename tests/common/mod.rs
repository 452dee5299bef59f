//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;

use conductor::agent::{AgentGraphBuilder, NowFn};
use conductor::chat::{ChatService, ChatStream};
use conductor::config::ConductorConfig;
use conductor::engine::ScriptedEngine;
use conductor::store::{InMemoryAgentStore, InMemoryConversationStore};
use conductor::types::{AgentDefinition, AgentId, StreamEvent};

pub const OWNER: &str = "owner-1";
pub const OTHER_OWNER: &str = "owner-2";

pub fn definition(id: AgentId, owner: &str, slug: &str) -> AgentDefinition {
    AgentDefinition {
        id,
        owner_id: owner.to_string(),
        slug: slug.to_string(),
        name: display_name(slug),
        purpose: format!("Handles {slug} questions"),
        instructions: format!("You are the {slug} agent."),
    }
}

/// `billing-desk` -> `Billing Desk`.
pub fn display_name(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Store holding `agents` (id, slug) for [`OWNER`].
pub async fn agent_store(agents: &[(AgentId, &str)]) -> Arc<InMemoryAgentStore> {
    let store = Arc::new(InMemoryAgentStore::new());
    for (id, slug) in agents {
        store
            .add_agent(definition(*id, OWNER, slug))
            .await
            .expect("fixture agent");
    }
    store
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn fixed_clock(now: DateTime<Utc>) -> NowFn {
    Arc::new(move || now)
}

pub fn builder(store: &Arc<InMemoryAgentStore>) -> AgentGraphBuilder {
    AgentGraphBuilder::new(store.clone(), store.clone()).with_clock(fixed_clock(at(2026, 10, 19, 12)))
}

pub struct ChatHarness {
    pub agents: Arc<InMemoryAgentStore>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub engine: Arc<ScriptedEngine>,
    pub chat: ChatService,
}

impl ChatHarness {
    pub async fn new(agents: &[(AgentId, &str)]) -> Self {
        Self::with_config(agents, ConductorConfig::default()).await
    }

    pub async fn with_config(agents: &[(AgentId, &str)], config: ConductorConfig) -> Self {
        Self::with_engine(agents, config, ScriptedEngine::new()).await
    }

    pub async fn with_engine(
        agents: &[(AgentId, &str)],
        config: ConductorConfig,
        engine: ScriptedEngine,
    ) -> Self {
        let agents = agent_store(agents).await;
        let conversations = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(engine);
        let chat = ChatService::new(
            agents.clone(),
            agents.clone(),
            engine.clone(),
            conversations.clone(),
            config,
        )
        .with_clock(fixed_clock(at(2026, 10, 19, 12)));
        Self {
            agents,
            conversations,
            engine,
            chat,
        }
    }
}

/// Drain a streamed turn.
pub async fn collect(stream: ChatStream) -> Vec<StreamEvent> {
    stream.events.collect().await
}
