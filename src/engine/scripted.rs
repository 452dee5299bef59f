//! Engine that replays queued scripts, for tests and local wiring.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::agent::ExecutableAgent;
use crate::error::{ConductorError, Result};
use crate::types::{ModelMessage, OwnerContext};

use super::events::RawRunEvent;
use super::{ExecutionEngine, RawEventStream, RunOutput};

const SCRIPT_SOURCE: &str = "scripted-engine";

/// One step of a scripted raw feed.
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    Event(RawRunEvent),
    /// Yield an upstream error and end the feed.
    Fail(String),
    /// Never yield again (exercises idle timeouts and disconnects).
    Stall,
}

#[derive(Debug)]
enum Script {
    Stream(Vec<ScriptedEvent>),
    Output(RunOutput),
    SetupFailure(String),
}

/// What the engine was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRun {
    pub agent_name: String,
    pub instructions: String,
    pub tool_names: Vec<String>,
    pub handoff_names: Vec<String>,
    pub input: Vec<ModelMessage>,
}

impl RecordedRun {
    fn capture(agent: &ExecutableAgent, input: &[ModelMessage]) -> Self {
        Self {
            agent_name: agent.name.clone(),
            instructions: agent.instructions.clone(),
            tool_names: agent.tool_names(),
            handoff_names: agent.handoff_names(),
            input: input.to_vec(),
        }
    }
}

/// Execution engine that replays queued scripts in FIFO order.
///
/// When the queue is empty, streamed runs echo the last input message and
/// plain runs return it as the final output.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<Script>>,
    recorded: Mutex<Vec<RecordedRun>>,
    preflight_error: Option<String>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail [`ExecutionEngine::preflight`] with a validation error.
    pub fn with_preflight_error(mut self, message: impl Into<String>) -> Self {
        self.preflight_error = Some(message.into());
        self
    }

    /// Queue a streamed run made only of events.
    pub async fn push_events(&self, events: Vec<RawRunEvent>) {
        self.push_stream(events.into_iter().map(ScriptedEvent::Event).collect())
            .await;
    }

    /// Queue a streamed run.
    pub async fn push_stream(&self, steps: Vec<ScriptedEvent>) {
        self.scripts.lock().await.push_back(Script::Stream(steps));
    }

    /// Queue a non-streamed run result.
    pub async fn push_output(&self, output: RunOutput) {
        self.scripts.lock().await.push_back(Script::Output(output));
    }

    /// Queue a run that fails before producing anything.
    pub async fn push_setup_failure(&self, message: impl Into<String>) {
        self.scripts
            .lock()
            .await
            .push_back(Script::SetupFailure(message.into()));
    }

    /// Runs received so far.
    pub async fn recorded(&self) -> Vec<RecordedRun> {
        self.recorded.lock().await.clone()
    }

    async fn next_script(&self, agent: &ExecutableAgent, input: &[ModelMessage]) -> Option<Script> {
        self.recorded
            .lock()
            .await
            .push(RecordedRun::capture(agent, input));
        self.scripts.lock().await.pop_front()
    }
}

fn echo_text(input: &[ModelMessage]) -> String {
    input.last().map(ModelMessage::text).unwrap_or_default()
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
    async fn preflight(&self, _owner: &OwnerContext) -> Result<()> {
        match &self.preflight_error {
            Some(message) => Err(ConductorError::Validation(message.clone())),
            None => Ok(()),
        }
    }

    async fn run(&self, agent: &ExecutableAgent, input: Vec<ModelMessage>) -> Result<RunOutput> {
        match self.next_script(agent, &input).await {
            Some(Script::Output(output)) => Ok(output),
            Some(Script::SetupFailure(message)) => Err(ConductorError::upstream(SCRIPT_SOURCE, message)),
            Some(Script::Stream(_)) => Err(ConductorError::InvalidState(
                "streamed script queued for a non-streamed run".into(),
            )),
            None => Ok(RunOutput {
                final_output: echo_text(&input),
                last_agent: agent.name.clone(),
            }),
        }
    }

    async fn run_streamed(
        &self,
        agent: ExecutableAgent,
        input: Vec<ModelMessage>,
    ) -> Result<RawEventStream> {
        let steps = match self.next_script(&agent, &input).await {
            Some(Script::Stream(steps)) => steps,
            Some(Script::SetupFailure(message)) => {
                return Err(ConductorError::upstream(SCRIPT_SOURCE, message))
            }
            Some(Script::Output(output)) => vec![
                ScriptedEvent::Event(RawRunEvent::response_started()),
                ScriptedEvent::Event(RawRunEvent::text_delta(output.final_output)),
                ScriptedEvent::Event(RawRunEvent::response_done()),
            ],
            None => vec![
                ScriptedEvent::Event(RawRunEvent::response_started()),
                ScriptedEvent::Event(RawRunEvent::text_delta(echo_text(&input))),
                ScriptedEvent::Event(RawRunEvent::response_done()),
            ],
        };

        let stream = async_stream::stream! {
            // The run owns its agent for as long as the feed is alive.
            let _agent = agent;
            for step in steps {
                match step {
                    ScriptedEvent::Event(event) => yield Ok(event),
                    ScriptedEvent::Fail(message) => {
                        yield Err(ConductorError::upstream(SCRIPT_SOURCE, message));
                        break;
                    }
                    ScriptedEvent::Stall => futures::future::pending::<()>().await,
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
