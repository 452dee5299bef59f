//! Execution engine seam.
//!
//! The engine (model inference, tool dispatch, handoff mechanics) is an
//! external collaborator. conductor hands it a freshly built
//! [`ExecutableAgent`] plus run-format input and consumes either a final
//! output or a raw event feed.

pub mod events;
pub mod scripted;

pub use events::{RawRunEvent, ResponseEvent, RunItemEvent, ToolCallItem, ToolCallKind};
pub use scripted::{RecordedRun, ScriptedEngine, ScriptedEvent};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::agent::ExecutableAgent;
use crate::error::Result;
use crate::types::{ModelMessage, OwnerContext};

/// Raw event feed for one streamed run.
pub type RawEventStream = BoxStream<'static, Result<RawRunEvent>>;

/// Result of a non-streamed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub final_output: String,
    /// Agent holding control when the run finished.
    pub last_agent: String,
}

/// Runs executable agents.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Checks that must pass before any stream is opened for `owner`
    /// (e.g. a model credential is configured). Failures should be
    /// [`ConductorError::Validation`](crate::error::ConductorError::Validation).
    async fn preflight(&self, _owner: &OwnerContext) -> Result<()> {
        Ok(())
    }

    /// Run to completion and return the final output.
    async fn run(&self, agent: &ExecutableAgent, input: Vec<ModelMessage>) -> Result<RunOutput>;

    /// Start a run and return its raw event feed. The run owns `agent`.
    ///
    /// Dropping the returned stream is the only cancellation signal
    /// conductor gives; engines are free to finish the run regardless.
    async fn run_streamed(
        &self,
        agent: ExecutableAgent,
        input: Vec<ModelMessage>,
    ) -> Result<RawEventStream>;
}
