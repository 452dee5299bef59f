//! Tool bindings attached to an executable agent.
//!
//! Three kinds, resolved in this order by the graph builder:
//! built-in capabilities, remote tool servers, and peer agents callable as
//! tools. A peer agent invoked as a tool answers and returns control, unlike
//! a handoff which transfers it.

pub mod agent_tool;

pub use agent_tool::AgentToolBinding;

use crate::types::{BuiltInCapability, OwnerId, ToolServer};

/// Built-in capability bound to its owner (memory is per owner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTool {
    pub capability: BuiltInCapability,
    pub owner_id: OwnerId,
}

/// Remote tool server the engine connects to on the agent's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteToolBinding {
    pub server: ToolServer,
}

/// A concrete tool available to an executable agent.
#[derive(Debug)]
pub enum ToolBinding {
    Capability(CapabilityTool),
    Remote(RemoteToolBinding),
    Agent(AgentToolBinding),
}

impl ToolBinding {
    /// Tool name as exposed to the model.
    pub fn name(&self) -> &str {
        match self {
            Self::Capability(tool) => <&'static str>::from(tool.capability),
            Self::Remote(tool) => &tool.server.label,
            Self::Agent(tool) => &tool.tool_name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Capability(tool) => tool.capability.description(),
            Self::Remote(tool) => &tool.server.url,
            Self::Agent(tool) => &tool.description,
        }
    }

    /// The wrapped peer agent, for agent tools.
    pub fn as_agent(&self) -> Option<&AgentToolBinding> {
        match self {
            Self::Agent(tool) => Some(tool),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn capability_tool_is_named_by_its_tag() {
        let binding = ToolBinding::Capability(CapabilityTool {
            capability: BuiltInCapability::CodeInterpreter,
            owner_id: "u1".into(),
        });
        assert_eq!(binding.name(), "code_interpreter");
        assert_eq!(
            binding.description(),
            BuiltInCapability::CodeInterpreter.description()
        );
    }

    #[test]
    fn remote_binding_is_named_by_label() {
        let binding = ToolBinding::Remote(RemoteToolBinding {
            server: ToolServer {
                id: "crm".into(),
                url: "https://crm.example.com/mcp".into(),
                label: "crm_tools".into(),
                headers: HashMap::new(),
            },
        });
        assert_eq!(binding.name(), "crm_tools");
        assert_eq!(binding.description(), "https://crm.example.com/mcp");
        assert!(binding.as_agent().is_none());
    }
}
