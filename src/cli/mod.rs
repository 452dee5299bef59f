//! Developer commands for inspecting agent graphs and raw run feeds.

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::agent::{AgentGraphBuilder, ExecutableAgent};
use crate::config::ConductorConfig;
use crate::engine::RawRunEvent;
use crate::error::{ConductorError, Result};
use crate::session::ConversationSessionAdapter;
use crate::store::{ConversationStore, FileConversationStore, InMemoryAgentStore};
use crate::stream::StreamEventTranslator;
use crate::tools::ToolBinding;
use crate::types::{ConversationId, ExchangeRole, OwnerContext, StreamEvent, StreamFrame};

/// Conductor CLI
#[derive(Parser, Debug)]
#[command(name = "conductor", version, about = "Agent graph and stream inspection")]
pub struct Cli {
    /// Config file (TOML); environment variables still apply on top
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an agent and print its executable tree
    Graph(GraphArgs),
    /// Translate a recorded raw event feed into wire frames
    Replay(ReplayArgs),
    /// Print a stored conversation from the data directory
    History(HistoryArgs),
}

/// Arguments for `conductor graph`.
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Agent catalog (TOML)
    #[arg(long)]
    pub agents: PathBuf,

    /// Owner to resolve as
    #[arg(long)]
    pub owner: String,

    /// Owner timezone (IANA name)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Root agent slug
    pub slug: String,
}

/// Arguments for `conductor replay`.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Raw events, one JSON object per line
    pub events: PathBuf,

    /// Name of the agent in control at the start
    #[arg(long, default_value = "agent")]
    pub agent: String,
}

/// Arguments for `conductor history`.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Conversation id
    pub conversation: ConversationId,

    /// Owner the conversation must belong to
    #[arg(long)]
    pub owner: String,

    /// Only the most recent N items
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn handle_graph(args: GraphArgs, config: &ConductorConfig) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.agents).await?;
    let store = Arc::new(InMemoryAgentStore::from_toml(&raw).await?);
    let builder = AgentGraphBuilder::new(store.clone(), store)
        .with_default_timezone(config.default_timezone.clone());

    let mut owner = OwnerContext::new(args.owner);
    if let Some(timezone) = args.timezone {
        owner = owner.with_timezone(timezone);
    }
    let agent = builder.build(&owner, &args.slug).await?;
    print!("{}", render_tree(&agent));
    Ok(())
}

pub async fn handle_replay(args: ReplayArgs) -> Result<()> {
    let file = std::fs::File::open(&args.events)?;
    let frames = replay_lines(std::io::BufReader::new(file), &args.agent)?;
    for frame in frames {
        println!("{}", frame.to_json()?);
    }
    Ok(())
}

pub async fn handle_history(args: HistoryArgs, config: &ConductorConfig) -> Result<()> {
    let store = Arc::new(FileConversationStore::from_config(config));
    let owner = OwnerContext::new(args.owner);
    for line in history_lines(store, &owner, args.conversation, args.limit).await? {
        println!("{line}");
    }
    Ok(())
}

/// One line per stored item, oldest first.
pub async fn history_lines(
    store: Arc<dyn ConversationStore>,
    owner: &OwnerContext,
    conversation_id: ConversationId,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let session = ConversationSessionAdapter::new(store.clone(), conversation_id)
        .session()
        .await?;
    if !owner.owns(&session.owner_id) {
        return Err(ConductorError::Unauthorized(format!(
            "conversation {conversation_id} belongs to another owner"
        )));
    }
    let items = store.list_items(conversation_id, limit).await?;
    Ok(items
        .iter()
        .map(|item| {
            let role = match item.role {
                ExchangeRole::User => "user",
                ExchangeRole::Assistant => "assistant",
                ExchangeRole::System => "system",
            };
            format!("{:>4} {role:<9} {}", item.seq, item.display_text)
        })
        .collect())
}

/// Translate raw JSON lines into the frames a client would receive,
/// ending with `done`. Blank lines are skipped.
pub fn replay_lines(reader: impl BufRead, root_agent: &str) -> Result<Vec<StreamFrame>> {
    let mut translator = StreamEventTranslator::new(root_agent);
    let mut frames = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: RawRunEvent = serde_json::from_str(&line).map_err(|e| {
            ConductorError::Validation(format!("line {}: {e}", index + 1))
        })?;
        if let Some(event) = translator.translate(event) {
            frames.push(event.to_frame());
        }
    }
    frames.push(StreamEvent::Done.to_frame());
    Ok(frames)
}

/// Indented outline of an executable agent.
pub fn render_tree(agent: &ExecutableAgent) -> String {
    let mut out = String::new();
    render_node(agent, 0, &mut out);
    out
}

fn render_node(agent: &ExecutableAgent, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}{} ({}, #{})", agent.name, agent.slug, agent.agent_id);
    for tool in &agent.tools {
        let kind = match tool {
            ToolBinding::Capability(_) => "capability",
            ToolBinding::Remote(_) => "remote",
            ToolBinding::Agent(_) => "agent",
        };
        let _ = writeln!(out, "{pad}  tool {} [{kind}]", tool.name());
        if let Some(peer) = tool.as_agent() {
            render_node(&peer.agent, depth + 2, out);
        }
    }
    for skipped in &agent.skipped {
        let _ = writeln!(
            out,
            "{pad}  skipped {} -> {} ({})",
            skipped.kind, skipped.target_slug, skipped.reason
        );
    }
    for handoff in &agent.handoffs {
        let _ = writeln!(out, "{pad}  handoff");
        render_node(handoff, depth + 2, out);
    }
}
