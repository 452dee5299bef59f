//! Agent graph composition: stored definitions in, executable trees out.

pub mod builder;
pub mod executable;
pub mod instructions;

pub use builder::{AgentGraphBuilder, EdgeResolution};
pub use executable::{EdgeKind, ExecutableAgent, SkipReason, SkippedEdge};
pub use instructions::{augment_instructions, render_datetime, resolve_timezone, system_clock, NowFn};
