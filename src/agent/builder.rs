//! Recursive resolution of a stored agent into an executable agent tree.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{ConductorError, Result};
use crate::store::{AgentStore, ToolServerRegistry};
use crate::tools::{AgentToolBinding, CapabilityTool, RemoteToolBinding, ToolBinding};
use crate::types::{AgentDefinition, BuiltInCapability, OwnerContext, ToolServer};

use super::executable::{EdgeKind, ExecutableAgent, SkipReason, SkippedEdge};
use super::instructions::{augment_instructions, resolve_timezone, system_clock, NowFn};

/// Outcome of following one handoff or peer-tool edge.
#[derive(Debug)]
pub enum EdgeResolution {
    Resolved(ExecutableAgent),
    Skipped(SkippedEdge),
}

/// Per-build state shared by every node of one tree.
struct BuildContext<'a> {
    owner: &'a OwnerContext,
    /// Owner's tool servers, read once per build.
    servers: Vec<ToolServer>,
    now: DateTime<Utc>,
    tz: Tz,
}

/// Builds [`ExecutableAgent`] trees from the agent store.
///
/// Every call reads the store afresh; nothing is memoized across builds or
/// within one. A diamond (A→B→D, A→C→D) therefore resolves D once per path,
/// yielding two independent subtrees.
///
/// Each branch carries its own copy of the slugs visited so far. An edge
/// that would re-enter one of them is skipped with a warning and the parent
/// is built without it.
pub struct AgentGraphBuilder {
    agents: Arc<dyn AgentStore>,
    tool_servers: Arc<dyn ToolServerRegistry>,
    default_timezone: String,
    now: NowFn,
}

impl AgentGraphBuilder {
    pub fn new(agents: Arc<dyn AgentStore>, tool_servers: Arc<dyn ToolServerRegistry>) -> Self {
        Self {
            agents,
            tool_servers,
            default_timezone: "UTC".to_string(),
            now: system_clock(),
        }
    }

    /// Timezone used when the owner has none configured.
    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    /// Replace the clock used for instruction dates.
    pub fn with_clock(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    /// Resolve `root_slug` for `owner`.
    ///
    /// Fails with `NotFound` when a slug does not resolve and `Unauthorized`
    /// when a resolved agent belongs to someone else. Cycles never fail the
    /// build: the edge closing one is recorded in
    /// [`ExecutableAgent::skipped`].
    pub async fn build(&self, owner: &OwnerContext, root_slug: &str) -> Result<ExecutableAgent> {
        let servers = self.tool_servers.list_for_owner(&owner.owner_id).await?;
        let ctx = BuildContext {
            owner,
            servers,
            now: (self.now)(),
            tz: resolve_timezone(owner.timezone.as_deref(), &self.default_timezone),
        };
        let agent = self
            .build_node(&ctx, root_slug.to_string(), HashSet::new())
            .await?;
        tracing::debug!(
            owner = %owner.owner_id,
            slug = root_slug,
            depth = agent.depth(),
            tools = agent.tools.len(),
            handoffs = agent.handoffs.len(),
            "built executable agent"
        );
        Ok(agent)
    }

    fn build_node<'a>(
        &'a self,
        ctx: &'a BuildContext<'a>,
        slug: String,
        mut visited: HashSet<String>,
    ) -> BoxFuture<'a, Result<ExecutableAgent>> {
        async move {
            // Re-entry is reported to the edge that caused it, which skips it.
            if visited.contains(&slug) {
                return Err(ConductorError::CircularDependency { slug });
            }

            let definition = self
                .agents
                .find_by_slug(ctx.owner, &slug)
                .await?
                .ok_or_else(|| ConductorError::NotFound(format!("agent '{slug}'")))?;
            ensure_owned(ctx.owner, &definition)?;

            tracing::debug!(slug = %slug, depth = visited.len(), "resolving agent");
            visited.insert(slug.clone());

            let mut tools = self.capability_tools(ctx, &definition).await?;
            tools.extend(self.remote_tools(ctx, &definition).await?);

            let mut skipped = Vec::new();
            for resolution in self.peer_tools(ctx, &definition, &visited).await? {
                match resolution {
                    EdgeResolution::Resolved(peer) => {
                        let purpose = peer.purpose.clone();
                        let binding = AgentToolBinding::new(peer, &purpose);
                        if tools.iter().any(|tool| tool.name() == binding.tool_name) {
                            tracing::warn!(
                                agent = %slug,
                                target = %binding.agent.slug,
                                tool = %binding.tool_name,
                                "peer tool name already taken on this agent, skipping"
                            );
                            skipped.push(SkippedEdge {
                                kind: EdgeKind::PeerTool,
                                target_slug: binding.agent.slug.clone(),
                                reason: SkipReason::NameConflict,
                            });
                            continue;
                        }
                        tools.push(ToolBinding::Agent(binding));
                    }
                    EdgeResolution::Skipped(edge) => skipped.push(edge),
                }
            }

            let mut handoffs = Vec::new();
            for resolution in self.handoffs(ctx, &definition, &visited).await? {
                match resolution {
                    EdgeResolution::Resolved(agent) => handoffs.push(agent),
                    EdgeResolution::Skipped(edge) => skipped.push(edge),
                }
            }

            Ok(ExecutableAgent {
                agent_id: definition.id,
                slug: definition.slug,
                name: definition.name,
                purpose: definition.purpose,
                instructions: augment_instructions(&definition.instructions, ctx.now, ctx.tz),
                tools,
                handoffs,
                skipped,
            })
        }
        .boxed()
    }

    async fn capability_tools(
        &self,
        ctx: &BuildContext<'_>,
        definition: &AgentDefinition,
    ) -> Result<Vec<ToolBinding>> {
        let tags = self.agents.list_built_in_capabilities(definition.id).await?;
        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(tags.len());
        for tag in tags {
            let Ok(capability) = BuiltInCapability::from_str(tag.trim()) else {
                tracing::warn!(agent = %definition.slug, tag = %tag, "ignoring unknown capability");
                continue;
            };
            if seen.insert(capability) {
                tools.push(ToolBinding::Capability(CapabilityTool {
                    capability,
                    owner_id: ctx.owner.owner_id.clone(),
                }));
            }
        }
        Ok(tools)
    }

    async fn remote_tools(
        &self,
        ctx: &BuildContext<'_>,
        definition: &AgentDefinition,
    ) -> Result<Vec<ToolBinding>> {
        let refs = self.agents.list_remote_tool_refs(definition.id).await?;
        let mut tools = Vec::with_capacity(refs.len());
        for reference in refs {
            match ctx.servers.iter().find(|s| s.id == reference.server_id) {
                Some(server) => tools.push(ToolBinding::Remote(RemoteToolBinding {
                    server: server.clone(),
                })),
                None => tracing::warn!(
                    agent = %definition.slug,
                    server_id = %reference.server_id,
                    "remote tool server not registered for owner, skipping"
                ),
            }
        }
        Ok(tools)
    }

    async fn peer_tools(
        &self,
        ctx: &BuildContext<'_>,
        definition: &AgentDefinition,
        visited: &HashSet<String>,
    ) -> Result<Vec<EdgeResolution>> {
        let peers = self.agents.list_peer_agent_refs(definition.id).await?;
        self.follow_edges(ctx, definition, peers, visited, EdgeKind::PeerTool)
            .await
    }

    async fn handoffs(
        &self,
        ctx: &BuildContext<'_>,
        definition: &AgentDefinition,
        visited: &HashSet<String>,
    ) -> Result<Vec<EdgeResolution>> {
        let targets = self.agents.list_handoff_targets(definition.id).await?;
        self.follow_edges(ctx, definition, targets, visited, EdgeKind::Handoff)
            .await
    }

    async fn follow_edges(
        &self,
        ctx: &BuildContext<'_>,
        definition: &AgentDefinition,
        targets: Vec<AgentDefinition>,
        visited: &HashSet<String>,
        kind: EdgeKind,
    ) -> Result<Vec<EdgeResolution>> {
        let mut seen = HashSet::new();
        let mut resolutions = Vec::with_capacity(targets.len());
        for target in targets {
            let skip = |reason| {
                EdgeResolution::Skipped(SkippedEdge {
                    kind,
                    target_slug: target.slug.clone(),
                    reason,
                })
            };
            if target.id == definition.id {
                resolutions.push(skip(SkipReason::SelfReference));
                continue;
            }
            if !seen.insert(target.id) {
                resolutions.push(skip(SkipReason::Duplicate));
                continue;
            }
            ensure_owned(ctx.owner, &target)?;

            match self
                .build_node(ctx, target.slug.clone(), visited.clone())
                .await
            {
                Ok(agent) => resolutions.push(EdgeResolution::Resolved(agent)),
                Err(ConductorError::CircularDependency { slug }) => {
                    tracing::warn!(
                        agent = %definition.slug,
                        target = %slug,
                        edge = %kind,
                        "edge would re-enter this branch, skipping"
                    );
                    resolutions.push(skip(SkipReason::Cycle));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(resolutions)
    }
}

fn ensure_owned(owner: &OwnerContext, definition: &AgentDefinition) -> Result<()> {
    if owner.owns(&definition.owner_id) {
        Ok(())
    } else {
        Err(ConductorError::Unauthorized(format!(
            "agent '{}' belongs to another owner",
            definition.slug
        )))
    }
}
