//! Application layer for foreman
//!
//! This crate contains the use cases (orchestrator, planner, agent runner),
//! the resource regulator that gates every inference call, port
//! definitions, and engine configuration. It depends only on the domain
//! layer.

pub mod config;
pub mod context;
pub mod ports;
pub mod regulator;
pub mod use_cases;

// Re-export commonly used types
pub use config::{EngineParams, ModelRoster};
pub use context::EngineContext;
pub use ports::{
    context_retriever::{ContextRetriever, ContextSnippet, NoContextRetriever},
    llm_gateway::{GatewayError, LlmGateway, LlmSession, StreamHandle, StreamReply},
    model_capabilities::{ModelCapabilities, StaticCapabilities},
    progress::{NoProgress, OrchestratorProgress},
    run_logger::{NoRunLogger, RunEvent, RunLogger},
    tool_executor::ToolExecutorPort,
};
pub use regulator::{
    RegulatorConfig, RegulatorError, RegulatorStatus, ResidentModel, ResourceLease,
    ResourceRegulator,
};
pub use use_cases::orchestrate::{Orchestrator, OrchestratorError};
pub use use_cases::plan_request::{Planner, PlannerError};
pub use use_cases::run_agent::{AgentRunError, AgentRunner};
