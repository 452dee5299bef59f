//! One chat turn end to end: validate, build, run, relay, persist.

use std::collections::HashMap;
use std::sync::Arc;

use bon::Builder;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::{AgentGraphBuilder, ExecutableAgent, NowFn};
use crate::config::ConductorConfig;
use crate::engine::ExecutionEngine;
use crate::error::{ConductorError, Result};
use crate::session::{restore_message, ConversationSessionAdapter};
use crate::store::{AgentStore, ConversationStore, ToolServerRegistry};
use crate::stream::{translate_run, StreamEventTranslator, TurnStatus};
use crate::types::{
    AgentId, ConversationId, ConversationSession, ExchangeRole, ModelMessage, OwnerContext,
    StreamEvent,
};

/// Inbound chat turn.
#[derive(Debug, Clone, Builder)]
pub struct ChatRequest {
    pub owner: OwnerContext,
    #[builder(into)]
    pub agent_slug: String,
    #[builder(into)]
    pub message: String,
    /// Existing conversation to continue; a new one is created when absent.
    pub conversation_id: Option<ConversationId>,
}

/// Reply to a non-streamed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub conversation_id: ConversationId,
    pub message: String,
    /// Agent that produced the reply.
    pub agent_name: String,
}

/// A streamed turn. `events` always starts with `Initialized` and ends with
/// `Done` or `Error`, unless the consumer stops reading first.
pub struct ChatStream {
    pub conversation_id: ConversationId,
    pub events: ReceiverStream<StreamEvent>,
}

/// Everything resolved before the engine is called.
struct PreparedTurn {
    agent: ExecutableAgent,
    /// `None` for a new conversation, which is created only once the turn
    /// has something to persist or a stream to hand back.
    session: Option<ConversationSession>,
    input: Vec<ModelMessage>,
    user_message: ModelMessage,
}

/// A prepared turn bound to a stored session.
struct BoundTurn {
    agent: ExecutableAgent,
    adapter: ConversationSessionAdapter,
    input: Vec<ModelMessage>,
    user_message: ModelMessage,
}

/// Settings copied into a spawned turn.
#[derive(Debug, Clone, Copy)]
struct TurnSettings {
    idle_timeout_ms: u64,
    persist_partial_on_error: bool,
}

/// Chat orchestrator.
///
/// Holds no per-conversation state: two concurrent turns on the same
/// conversation run independently and their appends may interleave.
pub struct ChatService {
    builder: AgentGraphBuilder,
    engine: Arc<dyn ExecutionEngine>,
    conversations: Arc<dyn ConversationStore>,
    config: ConductorConfig,
}

impl ChatService {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tool_servers: Arc<dyn ToolServerRegistry>,
        engine: Arc<dyn ExecutionEngine>,
        conversations: Arc<dyn ConversationStore>,
        config: ConductorConfig,
    ) -> Self {
        let builder = AgentGraphBuilder::new(agents, tool_servers)
            .with_default_timezone(config.default_timezone.clone());
        Self {
            builder,
            engine,
            conversations,
            config,
        }
    }

    /// Replace the clock used for instruction dates.
    pub fn with_clock(mut self, now: NowFn) -> Self {
        self.builder = self.builder.with_clock(now);
        self
    }

    pub fn config(&self) -> &ConductorConfig {
        &self.config
    }

    /// History adapter for an owned conversation.
    pub async fn session(
        &self,
        owner: &OwnerContext,
        conversation_id: ConversationId,
    ) -> Result<ConversationSessionAdapter> {
        self.owned_session(owner, conversation_id).await?;
        Ok(ConversationSessionAdapter::new(
            self.conversations.clone(),
            conversation_id,
        ))
    }

    /// Run a turn to completion and persist the exchange.
    ///
    /// A new conversation is created only after the run succeeds, so a
    /// failed first turn leaves nothing behind.
    pub async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let PreparedTurn {
            agent,
            session,
            input,
            user_message,
        } = self.prepare(&request).await?;

        let names = agent.name_index();
        let root_id = agent.agent_id;
        let output = self.engine.run(&agent, input).await?;

        let adapter = self.bind(&request.owner, &agent, session).await?;
        let agent_id = attribute(&names, &output.last_agent, root_id);
        let reply = ModelMessage::assistant(output.final_output.clone()).from_agent(&output.last_agent);
        persist_exchange(&adapter, &user_message, &reply, agent_id).await?;

        Ok(ChatReply {
            conversation_id: adapter.session_id(),
            message: output.final_output,
            agent_name: output.last_agent,
        })
    }

    /// Start a streamed turn.
    ///
    /// Validation, ownership and build failures are returned here, before
    /// any stream exists. Everything after is reported on the stream.
    pub async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let PreparedTurn {
            agent,
            session,
            input,
            user_message,
        } = self.prepare(&request).await?;
        let adapter = self.bind(&request.owner, &agent, session).await?;
        let conversation_id = adapter.session_id();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let settings = TurnSettings {
            idle_timeout_ms: self.config.stream_idle_timeout_ms,
            persist_partial_on_error: self.config.persist_partial_on_error,
        };
        let turn = BoundTurn {
            agent,
            adapter,
            input,
            user_message,
        };

        tokio::spawn(run_turn(self.engine.clone(), turn, tx, settings));

        Ok(ChatStream {
            conversation_id,
            events: ReceiverStream::new(rx),
        })
    }

    /// Drop the last exchange so it can be asked again.
    ///
    /// Pops the trailing assistant item (if any) and the user item before it,
    /// returning the user's text. `None` when there is nothing to regenerate.
    pub async fn regenerate(
        &self,
        owner: &OwnerContext,
        conversation_id: ConversationId,
    ) -> Result<Option<String>> {
        let adapter = self.session(owner, conversation_id).await?;
        let mut last = adapter.pop_last().await?;
        if matches!(&last, Some(item) if item.role == ExchangeRole::Assistant) {
            last = adapter.pop_last().await?;
        }
        match last {
            Some(item) if item.role == ExchangeRole::User => {
                let text = match restore_message(&item) {
                    Ok(message) => message.text(),
                    Err(_) => item.display_text,
                };
                Ok(Some(text))
            }
            Some(item) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    seq = item.seq,
                    "last exchange did not end with a user item"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn prepare(&self, request: &ChatRequest) -> Result<PreparedTurn> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ConductorError::Validation("message must not be empty".into()));
        }
        self.engine.preflight(&request.owner).await?;

        let existing = match request.conversation_id {
            Some(id) => Some(self.owned_session(&request.owner, id).await?),
            None => None,
        };

        let agent = self.builder.build(&request.owner, &request.agent_slug).await?;

        let mut input = match &existing {
            Some(session) if session.agent_id != agent.agent_id => {
                return Err(ConductorError::Validation(format!(
                    "conversation {} is bound to a different agent",
                    session.id
                )));
            }
            Some(session) => {
                ConversationSessionAdapter::new(self.conversations.clone(), session.id)
                    .get_context(self.config.history_limit)
                    .await?
            }
            None => Vec::new(),
        };
        let user_message = ModelMessage::user(message);
        input.push(user_message.clone());

        tracing::debug!(
            owner = %request.owner.owner_id,
            agent = %agent.name,
            conversation_id = ?existing.as_ref().map(|session| session.id),
            history = input.len() - 1,
            "prepared chat turn"
        );

        Ok(PreparedTurn {
            agent,
            session: existing,
            input,
            user_message,
        })
    }

    /// Adapter for the turn's session, creating it for a new conversation.
    async fn bind(
        &self,
        owner: &OwnerContext,
        agent: &ExecutableAgent,
        session: Option<ConversationSession>,
    ) -> Result<ConversationSessionAdapter> {
        let session = match session {
            Some(session) => session,
            None => {
                self.conversations
                    .create_session(&owner.owner_id, agent.agent_id)
                    .await?
            }
        };
        Ok(ConversationSessionAdapter::new(
            self.conversations.clone(),
            session.id,
        ))
    }

    async fn owned_session(
        &self,
        owner: &OwnerContext,
        id: ConversationId,
    ) -> Result<ConversationSession> {
        let session = self
            .conversations
            .get_session(id)
            .await?
            .ok_or_else(|| ConductorError::NotFound(format!("conversation {id}")))?;
        if !owner.owns(&session.owner_id) {
            return Err(ConductorError::Unauthorized(format!(
                "conversation {id} belongs to another owner"
            )));
        }
        Ok(session)
    }
}

/// Agent id for the name reported by the run, falling back to the root.
///
/// Runs report agents by display name only. If two agents in one tree share
/// a name, the reply goes to the first found depth-first
/// (see [`ExecutableAgent::name_index`]).
fn attribute(names: &HashMap<String, AgentId>, agent_name: &str, root_id: AgentId) -> AgentId {
    names.get(agent_name).copied().unwrap_or(root_id)
}

/// Store a completed exchange. A reply with no text is not stored, so it
/// never reaches later history; the user message is kept on its own.
async fn persist_exchange(
    adapter: &ConversationSessionAdapter,
    user_message: &ModelMessage,
    reply: &ModelMessage,
    agent_id: AgentId,
) -> Result<()> {
    if reply.text().is_empty() {
        tracing::info!(
            conversation_id = %adapter.session_id(),
            "run finished without text, storing the user message only"
        );
        return adapter.append(std::slice::from_ref(user_message), None).await;
    }
    adapter
        .append_turn(user_message, reply, Some(agent_id))
        .await
}

fn error_event(err: &ConductorError) -> StreamEvent {
    StreamEvent::Error {
        message: err.to_string(),
        code: err.code(),
    }
}

async fn run_turn(
    engine: Arc<dyn ExecutionEngine>,
    turn: BoundTurn,
    tx: mpsc::Sender<StreamEvent>,
    settings: TurnSettings,
) {
    let BoundTurn {
        agent,
        adapter,
        input,
        user_message,
    } = turn;
    let conversation_id = adapter.session_id();

    if tx
        .send(StreamEvent::Initialized { conversation_id })
        .await
        .is_err()
    {
        return;
    }

    let names = agent.name_index();
    let root_id = agent.agent_id;
    let translator = StreamEventTranslator::new(agent.name.clone());

    let raw = match engine.run_streamed(agent, input).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(conversation_id = %conversation_id, error = %err, "run failed to start");
            let _ = tx.send(error_event(&err)).await;
            return;
        }
    };

    let outcome = translate_run(translator, raw, &tx, settings.idle_timeout_ms).await;
    let agent_id = attribute(&names, &outcome.last_agent, root_id);
    let reply = ModelMessage::assistant(outcome.output.clone()).from_agent(&outcome.last_agent);
    let produced_output = outcome.produced_output();

    match outcome.status {
        TurnStatus::Completed => {
            let terminal = match persist_exchange(&adapter, &user_message, &reply, agent_id).await {
                Ok(()) => StreamEvent::Done,
                Err(err) => {
                    tracing::warn!(conversation_id = %conversation_id, error = %err, "failed to persist exchange");
                    error_event(&err)
                }
            };
            let _ = tx.send(terminal).await;
        }
        TurnStatus::Failed(err) => {
            if produced_output && settings.persist_partial_on_error {
                if let Err(persist_err) = adapter.append_turn(&user_message, &reply, Some(agent_id)).await {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %persist_err,
                        "failed to persist partial exchange"
                    );
                }
            }
            tracing::warn!(conversation_id = %conversation_id, error = %err, "run failed");
            let _ = tx.send(error_event(&err)).await;
        }
        TurnStatus::Disconnected => {
            tracing::debug!(conversation_id = %conversation_id, "client disconnected, exchange not persisted");
        }
    }
}
