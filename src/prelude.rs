//! Convenience re-exports for common use.

pub use crate::agent::{AgentGraphBuilder, ExecutableAgent};
pub use crate::chat::{ChatReply, ChatRequest, ChatService, ChatStream};
pub use crate::config::ConductorConfig;
pub use crate::engine::{ExecutionEngine, RawRunEvent, RunOutput};
pub use crate::error::{ConductorError, Result};
pub use crate::session::ConversationSessionAdapter;
pub use crate::store::{AgentStore, ConversationStore, ToolServerRegistry};
pub use crate::stream::StreamEventTranslator;
pub use crate::types::{
    AgentDefinition, ContentPart, ModelMessage, OwnerContext, Role, StreamEvent, StreamFrame,
};
