//! Peer agent exposed as a callable tool.

use std::sync::OnceLock;

use regex::Regex;

use crate::agent::ExecutableAgent;
use crate::engine::ExecutionEngine;
use crate::error::{ConductorError, Result};
use crate::types::ModelMessage;

/// A peer agent the owning agent can call while keeping control.
#[derive(Debug)]
pub struct AgentToolBinding {
    pub tool_name: String,
    pub description: String,
    pub agent: Box<ExecutableAgent>,
}

impl AgentToolBinding {
    pub fn new(agent: ExecutableAgent, purpose: &str) -> Self {
        let description = if purpose.trim().is_empty() {
            format!("Ask {} for help", agent.name)
        } else {
            purpose.trim().to_string()
        };
        Self {
            tool_name: tool_name_for_slug(&agent.slug),
            description,
            agent: Box::new(agent),
        }
    }

    /// Run the wrapped agent on `input` and return its final answer.
    pub async fn invoke(&self, engine: &dyn ExecutionEngine, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            return Err(ConductorError::Validation(format!(
                "{}: empty tool input",
                self.tool_name
            )));
        }
        tracing::debug!(tool = %self.tool_name, agent = %self.agent.name, "invoking agent tool");
        let output = engine
            .run(&self.agent, vec![ModelMessage::user(input)])
            .await?;
        Ok(output.final_output)
    }
}

/// `ask_<slug>` restricted to `[a-z0-9_]`.
pub fn tool_name_for_slug(slug: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^a-z0-9_]+").expect("tool name regex must compile"));
    let lowered = slug.trim().to_ascii_lowercase();
    let cleaned = invalid.replace_all(&lowered, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "ask_agent".to_string()
    } else {
        format!("ask_{cleaned}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_are_sanitized() {
        assert_eq!(tool_name_for_slug("research-bot"), "ask_research_bot");
        assert_eq!(tool_name_for_slug("Data.Analyst 2"), "ask_data_analyst_2");
        assert_eq!(tool_name_for_slug("--"), "ask_agent");
    }
}
