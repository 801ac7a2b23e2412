//! Progress notification port
//!
//! Defines the interface for reporting progress while the foreman works on
//! a request.

use foreman_domain::{
    Advisory, AgentResult, AgentType, Plan, SupervisionState, ToolCall, ToolResult,
};

/// Callbacks for progress updates during orchestration.
///
/// Every method has a no-op default so presenters only implement what they
/// display.
pub trait OrchestratorProgress: Send + Sync {
    /// Called after every state transition
    fn on_state(&self, _state: SupervisionState) {}

    /// Called when a dispatch round starts
    fn on_round_start(&self, _round: u32, _max_rounds: u32) {}

    /// Called when a plan has been accepted
    fn on_plan(&self, _plan: &Plan) {}

    /// Called when an agent runner starts
    fn on_agent_start(&self, _agent_type: AgentType, _task: &str) {}

    /// Called when an agent runner returns
    fn on_agent_complete(&self, _result: &AgentResult) {}

    /// Called for each text chunk from a streaming model
    fn on_llm_chunk(&self, _chunk: &str) {}

    /// Called before a tool is executed
    fn on_tool_call(&self, _agent_type: AgentType, _call: &ToolCall) {}

    /// Called after a tool returns
    fn on_tool_result(&self, _agent_type: AgentType, _result: &ToolResult) {}

    /// Called when a non-fatal condition is recorded
    fn on_advisory(&self, _advisory: &Advisory) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl OrchestratorProgress for NoProgress {}
