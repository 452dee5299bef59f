//! Stored agent configuration as handed over by the data layer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Numeric agent identifier (unique across owners).
pub type AgentId = i64;

/// Owner identifier as issued by the session layer.
pub type OwnerId = String;

/// Identity of the caller on whose behalf agents are resolved and run.
///
/// Ownership has already been authenticated upstream; conductor only
/// compares ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerContext {
    pub owner_id: OwnerId,
    /// IANA timezone name (e.g. `Europe/Berlin`). `None` means "use the default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl OwnerContext {
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Whether `owner_id` is this caller.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Built-in capability an agent can enable by tag.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuiltInCapability {
    Memory,
    WebSearch,
    FileSearch,
    CodeInterpreter,
    ImageGeneration,
}

impl BuiltInCapability {
    /// Short description given to the model alongside the tool.
    pub fn description(self) -> &'static str {
        match self {
            Self::Memory => "Store and recall facts about the user across conversations",
            Self::WebSearch => "Search the web for current information",
            Self::FileSearch => "Search the user's uploaded files",
            Self::CodeInterpreter => "Run code in a sandbox and return the result",
            Self::ImageGeneration => "Generate an image from a text prompt",
        }
    }
}

/// Persisted agent definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub owner_id: OwnerId,
    /// Unique within an owner.
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub instructions: String,
}

/// Reference from an agent to one of its owner's remote tool servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteToolRef {
    pub server_id: String,
}

/// Owner-configured remote tool server endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServer {
    pub id: String,
    pub url: String,
    pub label: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        header_names.sort_unstable();
        f.debug_struct("ToolServer")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("label", &self.label)
            .field("headers", &header_names)
            .finish()
    }
}
