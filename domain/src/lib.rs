//! Domain layer for foreman
//!
//! This crate contains the core rules, entities, and value objects of the
//! orchestration engine. It has no dependencies on infrastructure concerns
//! and performs no I/O.
//!
//! # Core Concepts
//!
//! - **Agent types**: the closed set of sub-agents (explorer, executor,
//!   planner) and the tool permissions each one holds
//! - **Plan**: a validated, dependency-ordered decomposition of a request,
//!   with parallel groups computed by layered topological ordering
//! - **Supervision**: the foreman's state machine, complexity classification,
//!   heuristic routing, and review decisions

pub mod agent;
pub mod core;
pub mod orchestration;
pub mod plan;
pub mod prompt;
pub mod session;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use agent::{
    agent_type::{AgentType, Permission},
    entities::{AgentResult, AgentRunStatus, AgentTask},
};
pub use crate::core::{
    error::DomainError,
    model::{Model, ModelTier},
};
pub use orchestration::{
    complexity::{Classification, Complexity, classify},
    outcome::{Advisory, OrchestrationOutcome, OutcomeStatus, RoundRecord},
    review::{ReviewContext, ReviewDecision, decide_review},
    routing::{DirectReply, Route, route_request},
    spawn::{FollowUp, extract_follow_up, spawn_tool_definitions},
    state::{ReviewOutcome, SupervisionEvent, SupervisionState},
};
pub use plan::{
    entities::{Plan, PlanError, PlanStep, StepOutcomes, compute_parallel_groups},
    parser::{parse_plan, parse_plan_json},
};
pub use prompt::AgentPromptTemplate;
pub use session::{
    entities::{ConversationHistory, Message, Role},
    stream::StreamEvent,
};
pub use tool::{
    entities::{ToolCall, ToolDefinition, ToolParameter, ToolSpec},
    parsing::{extract_json_objects, parse_text_tool_calls},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};
