//! Supervision and agent loop limits (`[engine]` section)

use foreman_application::EngineParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub max_rounds: u32,
    pub max_retries_per_step: u32,
    pub agent_timeout_secs: u64,
    pub max_agent_iterations: usize,
    pub history_limit: usize,
    pub context_snippets: usize,
    pub tool_output_limit: usize,
    pub project_dir: String,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let defaults = EngineParams::default();
        Self {
            max_rounds: defaults.max_rounds,
            max_retries_per_step: defaults.max_retries_per_step,
            agent_timeout_secs: defaults.agent_timeout.as_secs(),
            max_agent_iterations: defaults.max_agent_iterations,
            history_limit: defaults.history_limit,
            context_snippets: defaults.context_snippets,
            tool_output_limit: defaults.tool_output_limit,
            project_dir: defaults.project_dir,
        }
    }
}

impl FileEngineConfig {
    pub fn to_engine_params(&self) -> EngineParams {
        EngineParams {
            max_rounds: self.max_rounds,
            max_retries_per_step: self.max_retries_per_step,
            agent_timeout: Duration::from_secs(self.agent_timeout_secs),
            max_agent_iterations: self.max_agent_iterations,
            history_limit: self.history_limit,
            context_snippets: self.context_snippets,
            tool_output_limit: self.tool_output_limit,
            project_dir: self.project_dir.clone(),
        }
    }
}
