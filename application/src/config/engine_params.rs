//! Engine parameters: supervision and agent loop control.
//!
//! [`EngineParams`] groups the static parameters that bound the
//! orchestrator's rounds and each agent runner's tool-use loop. These are
//! application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop control parameters shared by the orchestrator, planner, and runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Maximum Dispatch → Review cycles per request.
    pub max_rounds: u32,
    /// Retries of one step (or one unplanned task) before a forced handoff.
    pub max_retries_per_step: u32,
    /// Wall-clock limit for one agent runner, excluding admission.
    pub agent_timeout: Duration,
    /// Maximum model turns in one agent's tool-use loop.
    pub max_agent_iterations: usize,
    /// Conversation exchanges kept as request context.
    pub history_limit: usize,
    /// Reference snippets requested per agent task.
    pub context_snippets: usize,
    /// Bytes of a single tool output fed back to the model.
    pub tool_output_limit: usize,
    /// Working directory shown to the models.
    pub project_dir: String,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            max_retries_per_step: 2,
            agent_timeout: Duration::from_secs(300),
            max_agent_iterations: 10,
            history_limit: 10,
            context_snippets: 3,
            tool_output_limit: 8_000,
            project_dir: ".".to_string(),
        }
    }
}

impl EngineParams {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_max_retries_per_step(mut self, max: u32) -> Self {
        self.max_retries_per_step = max;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_max_agent_iterations(mut self, max: usize) -> Self {
        self.max_agent_iterations = max;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<String>) -> Self {
        self.project_dir = dir.into();
        self
    }
}
