//! Raw run events to client stream events.

use crate::engine::{RawRunEvent, ResponseEvent, RunItemEvent};
use crate::types::{StreamEvent, ToolStatus};

/// Stateful normalizer for one run's raw feed.
///
/// Tracks which agent holds control and accumulates the assistant text that
/// is persisted once the run ends.
#[derive(Debug, Clone)]
pub struct StreamEventTranslator {
    current_agent: String,
    output: String,
}

impl StreamEventTranslator {
    /// Start a translation with `root_agent` in control.
    pub fn new(root_agent: impl Into<String>) -> Self {
        Self {
            current_agent: root_agent.into(),
            output: String::new(),
        }
    }

    /// Map one raw event to at most one client event.
    ///
    /// Message-finalized, reasoning and unrecognized events yield `None`.
    pub fn translate(&mut self, event: RawRunEvent) -> Option<StreamEvent> {
        match event {
            RawRunEvent::AgentUpdated { agent_name } => {
                self.current_agent = agent_name.clone();
                Some(StreamEvent::AgentSwitched { agent_name })
            }
            RawRunEvent::RawResponse { data } => self.translate_response(data),
            RawRunEvent::RunItem { item } => translate_item(item),
            RawRunEvent::Unknown => None,
        }
    }

    fn translate_response(&mut self, data: ResponseEvent) -> Option<StreamEvent> {
        match data {
            ResponseEvent::ResponseCreated => Some(StreamEvent::Started),
            ResponseEvent::OutputTextDelta { delta } => {
                if delta.is_empty() {
                    return None;
                }
                self.output.push_str(&delta);
                Some(StreamEvent::TextDelta { text: delta })
            }
            ResponseEvent::ResponseCompleted => Some(StreamEvent::Stopped),
            ResponseEvent::Other => None,
        }
    }

    /// Accumulated assistant text so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Agent currently holding control.
    pub fn current_agent(&self) -> &str {
        &self.current_agent
    }

    /// Whether any assistant text has been emitted.
    pub fn produced_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Consume the translator, returning `(output, last_agent)`.
    pub fn finish(self) -> (String, String) {
        (self.output, self.current_agent)
    }
}

fn translate_item(item: RunItemEvent) -> Option<StreamEvent> {
    match item {
        RunItemEvent::ToolCalled { agent_name, call } => Some(StreamEvent::ToolInvocation {
            tool_name: call.kind.display_name().to_string(),
            agent_name,
            status: ToolStatus::Executing,
        }),
        RunItemEvent::ToolOutput {
            agent_name, call, ..
        } => Some(StreamEvent::ToolInvocation {
            tool_name: call.kind.display_name().to_string(),
            agent_name,
            status: ToolStatus::Completed,
        }),
        RunItemEvent::HandoffRequested { target_name, .. } => {
            Some(StreamEvent::HandoffRequested { target_name })
        }
        RunItemEvent::HandoffOccurred { target_name, .. } => {
            Some(StreamEvent::HandoffCompleted { target_name })
        }
        RunItemEvent::MessageOutputCreated { .. }
        | RunItemEvent::ReasoningItemCreated { .. }
        | RunItemEvent::Unknown => None,
    }
}
