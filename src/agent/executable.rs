//! Fully resolved agent handed to the execution engine for one run.

use std::collections::HashMap;

use strum::Display;

use crate::tools::ToolBinding;
use crate::types::AgentId;

/// Why an edge was left out of an executable agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    SelfReference,
    Duplicate,
    /// Following the edge would revisit an agent already on this branch.
    Cycle,
    /// Another tool on the agent already has the derived tool name.
    NameConflict,
}

/// Which kind of edge was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EdgeKind {
    Handoff,
    PeerTool,
}

/// A handoff or peer-tool edge that was not followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEdge {
    pub kind: EdgeKind,
    pub target_slug: String,
    pub reason: SkipReason,
}

/// Ephemeral agent tree built for exactly one run.
///
/// Constructed fresh on every chat turn and owned by that run; there is no
/// `Clone` so it cannot quietly be cached or shared.
#[derive(Debug)]
pub struct ExecutableAgent {
    pub agent_id: AgentId,
    pub slug: String,
    pub name: String,
    /// Stored purpose, used as the handoff description.
    pub purpose: String,
    /// Stored instructions plus the current date in the owner's timezone.
    pub instructions: String,
    pub tools: Vec<ToolBinding>,
    pub handoffs: Vec<ExecutableAgent>,
    pub skipped: Vec<SkippedEdge>,
}

impl ExecutableAgent {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn handoff_names(&self) -> Vec<String> {
        self.handoffs.iter().map(|h| h.name.clone()).collect()
    }

    /// Handoff target by slug.
    pub fn handoff(&self, slug: &str) -> Option<&ExecutableAgent> {
        self.handoffs.iter().find(|h| h.slug == slug)
    }

    /// Depth of the handoff tree (a leaf is 1).
    pub fn depth(&self) -> usize {
        1 + self.handoffs.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Depth-first search by display name through handoffs and agent tools.
    pub fn find(&self, name: &str) -> Option<&ExecutableAgent> {
        if self.name == name {
            return Some(self);
        }
        self.children().find_map(|child| child.find(name))
    }

    /// Display name to agent id for every agent reachable from here.
    ///
    /// When several agents share a name, the first one found depth-first wins.
    pub fn name_index(&self) -> HashMap<String, AgentId> {
        let mut index = HashMap::new();
        self.collect_names(&mut index);
        index
    }

    fn collect_names(&self, index: &mut HashMap<String, AgentId>) {
        index.entry(self.name.clone()).or_insert(self.agent_id);
        for child in self.children() {
            child.collect_names(index);
        }
    }

    fn children(&self) -> impl Iterator<Item = &ExecutableAgent> {
        self.handoffs.iter().chain(
            self.tools
                .iter()
                .filter_map(ToolBinding::as_agent)
                .map(|tool| tool.agent.as_ref()),
        )
    }
}
