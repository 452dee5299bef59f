//! Conductor: agent composition and streaming conversation orchestration.
//!
//! Turns stored agent definitions (instructions, built-in capabilities,
//! remote tool servers, peer agents and handoff targets) into executable
//! agent trees, feeds conversation history into an external execution
//! engine, and relays the engine's raw event feed to a client as an ordered,
//! normalized stream while persisting the exchange.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use conductor::prelude::*;
//! use conductor::engine::ScriptedEngine;
//! use conductor::store::{InMemoryAgentStore, InMemoryConversationStore};
//! use futures::StreamExt;
//!
//! # async fn example() -> conductor::error::Result<()> {
//! let agents = Arc::new(InMemoryAgentStore::from_toml(r#"
//!     [[agents]]
//!     id = 1
//!     owner_id = "u1"
//!     slug = "helper"
//!     name = "Helper"
//! "#).await?);
//! let chat = ChatService::new(
//!     agents.clone(),
//!     agents,
//!     Arc::new(ScriptedEngine::new()),
//!     Arc::new(InMemoryConversationStore::new()),
//!     ConductorConfig::default(),
//! );
//!
//! let request = ChatRequest::builder()
//!     .owner(OwnerContext::new("u1"))
//!     .agent_slug("helper")
//!     .message("Hello!")
//!     .build();
//! let mut turn = chat.stream(request).await?;
//! while let Some(event) = turn.events.next().await {
//!     println!("{}", event.to_frame().to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod session;
pub mod store;
pub mod stream;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
