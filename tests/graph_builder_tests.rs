//! Tests for agent graph resolution.

mod common;

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use conductor::agent::{AgentGraphBuilder, EdgeKind, SkipReason, SkippedEdge};
use conductor::engine::{RunOutput, ScriptedEngine};
use conductor::error::ConductorError;
use conductor::tools::ToolBinding;
use conductor::types::{BuiltInCapability, OwnerContext, ToolServer};

use common::*;

fn owner() -> OwnerContext {
    OwnerContext::new(OWNER)
}

fn server(id: &str, label: &str) -> ToolServer {
    ToolServer {
        id: id.to_string(),
        url: format!("https://{id}.example.com/mcp"),
        label: label.to_string(),
        headers: HashMap::from([("Authorization".to_string(), "Bearer secret".to_string())]),
    }
}

#[tokio::test]
async fn plain_agent_gets_stored_instructions_plus_current_date() {
    let store = agent_store(&[(1, "helper")]).await;

    let monday = AgentGraphBuilder::new(store.clone(), store.clone())
        .with_clock(fixed_clock(at(2026, 10, 19, 12)))
        .build(&owner(), "helper")
        .await
        .unwrap();
    let tuesday = AgentGraphBuilder::new(store.clone(), store.clone())
        .with_clock(fixed_clock(at(2026, 10, 20, 12)))
        .build(&owner(), "helper")
        .await
        .unwrap();

    assert_eq!(
        monday.instructions,
        "You are the helper agent.\n\nCurrent date and time: Monday, October 19, 2026 at 12:00 (UTC)"
    );
    assert!(tuesday.instructions.starts_with("You are the helper agent.\n\n"));
    assert_ne!(monday.instructions, tuesday.instructions);
    assert!(monday.tools.is_empty());
    assert!(monday.handoffs.is_empty());
    assert_eq!(monday.name, "Helper");
    assert_eq!(monday.depth(), 1);
}

#[tokio::test]
async fn owner_timezone_shifts_the_rendered_date() {
    let store = agent_store(&[(1, "helper")]).await;
    let tokyo = owner().with_timezone("Asia/Tokyo");

    let agent = builder(&store).build(&tokyo, "helper").await.unwrap();
    assert!(agent
        .instructions
        .ends_with("Monday, October 19, 2026 at 21:00 (Asia/Tokyo)"));

    let fallback = builder(&store)
        .with_default_timezone("America/New_York")
        .build(&owner(), "helper")
        .await
        .unwrap();
    assert!(fallback
        .instructions
        .ends_with("Monday, October 19, 2026 at 08:00 (America/New_York)"));
}

#[tokio::test]
async fn mutual_handoffs_drop_the_back_edge() {
    let store = agent_store(&[(1, "triage"), (2, "billing")]).await;
    store.add_handoff(1, 2).await;
    store.add_handoff(2, 1).await;

    let root = builder(&store).build(&owner(), "triage").await.unwrap();

    assert_eq!(root.handoff_names(), vec!["Billing".to_string()]);
    let billing = root.handoff("billing").unwrap();
    assert!(billing.handoffs.is_empty());
    assert_eq!(
        billing.skipped,
        vec![SkippedEdge {
            kind: EdgeKind::Handoff,
            target_slug: "triage".into(),
            reason: SkipReason::Cycle,
        }]
    );
    assert_eq!(root.depth(), 2);
}

#[tokio::test]
async fn longer_cycle_is_bounded_by_distinct_slugs() {
    let store = agent_store(&[(1, "a"), (2, "b"), (3, "c")]).await;
    store.add_handoff(1, 2).await;
    store.add_handoff(2, 3).await;
    store.add_handoff(3, 1).await;
    store.add_handoff(3, 2).await;

    let root = builder(&store).build(&owner(), "a").await.unwrap();

    assert_eq!(root.depth(), 3);
    let c = root.handoff("b").and_then(|b| b.handoff("c")).unwrap();
    assert!(c.handoffs.is_empty());
    let reasons: Vec<(String, SkipReason)> = c
        .skipped
        .iter()
        .map(|s| (s.target_slug.clone(), s.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![("a".to_string(), SkipReason::Cycle), ("b".to_string(), SkipReason::Cycle)]
    );
}

#[tokio::test]
async fn diamond_resolves_shared_target_once_per_path() {
    let store = agent_store(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]).await;
    store.add_handoff(1, 2).await;
    store.add_handoff(1, 3).await;
    store.add_handoff(2, 4).await;
    store.add_handoff(3, 4).await;

    let root = builder(&store).build(&owner(), "a").await.unwrap();

    let via_b = root.handoff("b").and_then(|b| b.handoff("d")).unwrap();
    let via_c = root.handoff("c").and_then(|c| c.handoff("d")).unwrap();
    assert!(!std::ptr::eq(via_b, via_c));
    assert_eq!(via_b.agent_id, 4);
    assert_eq!(via_c.agent_id, 4);
    assert_eq!(via_b.instructions, via_c.instructions);
    assert!(root.skipped.is_empty());
}

#[tokio::test]
async fn tools_resolve_in_capability_remote_peer_order() {
    let store = agent_store(&[(1, "triage"), (2, "research")]).await;
    store.add_peer_tool(1, 2).await;
    store.add_remote_tool(1, "crm").await;
    store.add_remote_tool(1, "missing").await;
    store.enable_capability(1, "web_search").await;
    store.enable_capability(1, "teleportation").await;
    store.enable_capability(1, "memory").await;
    store.enable_capability(1, "web_search").await;
    store.add_tool_server(OWNER, server("crm", "crm_tools")).await;
    store.add_tool_server(OTHER_OWNER, server("missing", "not_yours")).await;

    let root = builder(&store).build(&owner(), "triage").await.unwrap();

    assert_eq!(
        root.tool_names(),
        vec![
            "web_search".to_string(),
            "memory".to_string(),
            "crm_tools".to_string(),
            "ask_research".to_string(),
        ]
    );
    match &root.tools[0] {
        ToolBinding::Capability(tool) => {
            assert_eq!(tool.capability, BuiltInCapability::WebSearch);
            assert_eq!(tool.owner_id, OWNER);
        }
        other => panic!("expected capability tool, got {other:?}"),
    }
    let peer = root.tools[3].as_agent().unwrap();
    assert_eq!(peer.description, "Handles research questions");
    assert!(peer.agent.instructions.starts_with("You are the research agent."));
}

#[tokio::test]
async fn unknown_root_is_not_found() {
    let store = agent_store(&[(1, "helper")]).await;
    let err = builder(&store).build(&owner(), "nobody").await.unwrap_err();
    assert!(matches!(err, ConductorError::NotFound(_)));
}

#[tokio::test]
async fn foreign_root_is_unauthorized() {
    let store = agent_store(&[(1, "helper")]).await;
    store
        .add_agent(definition(2, OTHER_OWNER, "private"))
        .await
        .unwrap();

    let err = builder(&store).build(&owner(), "private").await.unwrap_err();
    assert!(matches!(err, ConductorError::Unauthorized(_)));
}

#[tokio::test]
async fn foreign_peer_tool_is_unauthorized() {
    let store = agent_store(&[(1, "helper")]).await;
    store
        .add_agent(definition(2, OTHER_OWNER, "private"))
        .await
        .unwrap();
    store.add_peer_tool(1, 2).await;

    let err = builder(&store).build(&owner(), "helper").await.unwrap_err();
    assert!(matches!(err, ConductorError::Unauthorized(_)));
}

#[tokio::test]
async fn every_build_reads_the_latest_configuration() {
    let store = agent_store(&[(1, "triage"), (2, "billing")]).await;
    store.add_handoff(1, 2).await;
    let builder = builder(&store);

    let first = builder.build(&owner(), "triage").await.unwrap();
    assert_eq!(first.handoff_names(), vec!["Billing".to_string()]);

    store.remove_handoff(1, 2).await;
    store.set_instructions(1, "Be terse.").await;

    let second = builder.build(&owner(), "triage").await.unwrap();
    assert!(second.handoffs.is_empty());
    assert!(second.instructions.starts_with("Be terse.\n\n"));
}

#[tokio::test]
async fn peer_agent_tool_answers_and_returns_control() {
    let store = agent_store(&[(1, "triage"), (2, "research")]).await;
    store.add_peer_tool(1, 2).await;
    let root = builder(&store).build(&owner(), "triage").await.unwrap();
    let peer = root.tools[0].as_agent().unwrap();

    let engine = ScriptedEngine::new();
    engine
        .push_output(RunOutput {
            final_output: "Found three sources.".into(),
            last_agent: "Research".into(),
        })
        .await;

    let answer = peer.invoke(&engine, "find sources").await.unwrap();
    assert_eq!(answer, "Found three sources.");

    let runs = engine.recorded().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].agent_name, "Research");
    assert_eq!(runs[0].input[0].text(), "find sources");

    let err = peer.invoke(&engine, "   ").await.unwrap_err();
    assert!(matches!(err, ConductorError::Validation(_)));
}

#[tokio::test]
async fn peer_tools_with_colliding_names_keep_the_first() {
    let store = agent_store(&[(1, "root"), (2, "data-bot"), (3, "data_bot")]).await;
    store.add_peer_tool(1, 2).await;
    store.add_peer_tool(1, 3).await;

    let root = builder(&store).build(&owner(), "root").await.unwrap();
    let names: Vec<&str> = root.tools.iter().map(ToolBinding::name).collect();
    assert_eq!(names, vec!["ask_data_bot"]);
    assert_eq!(root.tools[0].as_agent().unwrap().agent.slug, "data-bot");
    assert_eq!(
        root.skipped,
        vec![SkippedEdge {
            kind: EdgeKind::PeerTool,
            target_slug: "data_bot".into(),
            reason: SkipReason::NameConflict,
        }]
    );
}
