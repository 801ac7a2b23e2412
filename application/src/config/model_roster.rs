//! Model roster: which model serves which role.

use foreman_domain::{AgentTask, AgentType, Model, ModelTier};
use serde::{Deserialize, Serialize};

/// Model assignment per role and tier.
///
/// The planner always runs on the full tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoster {
    /// Foreman: routing, direct answers, review
    pub orchestration: Model,
    pub planning: Model,
    pub exploration: Model,
    pub execution: Model,
    pub exploration_lite: Model,
    pub execution_lite: Model,
}

impl Default for ModelRoster {
    fn default() -> Self {
        let full = Model::new("qwen2.5-coder:7b");
        let lite = Model::new("llama3.2:3b");
        Self {
            orchestration: full.clone(),
            planning: full.clone(),
            exploration: full.clone(),
            execution: full,
            exploration_lite: lite.clone(),
            execution_lite: lite,
        }
    }
}

impl ModelRoster {
    /// Tier actually used for `agent_type` when `requested` was asked for
    pub fn effective_tier(agent_type: AgentType, requested: ModelTier) -> ModelTier {
        if agent_type.supports_lite_tier() {
            requested
        } else {
            ModelTier::Full
        }
    }

    pub fn model_for(&self, agent_type: AgentType, tier: ModelTier) -> &Model {
        match (agent_type, Self::effective_tier(agent_type, tier)) {
            (AgentType::Explorer, ModelTier::Lite) => &self.exploration_lite,
            (AgentType::Explorer, ModelTier::Full) => &self.exploration,
            (AgentType::Executor, ModelTier::Lite) => &self.execution_lite,
            (AgentType::Executor, ModelTier::Full) => &self.execution,
            (AgentType::Planner, _) => &self.planning,
        }
    }

    /// Build a task with its tier and model resolved
    pub fn task(&self, task: impl Into<String>, agent_type: AgentType, tier: ModelTier) -> AgentTask {
        let tier = Self::effective_tier(agent_type, tier);
        AgentTask::new(task, agent_type, tier, self.model_for(agent_type, tier).clone())
    }

    /// Distinct models named by the roster, in role order
    pub fn models(&self) -> Vec<&Model> {
        let mut models: Vec<&Model> = Vec::new();
        for model in [
            &self.orchestration,
            &self.planning,
            &self.exploration,
            &self.execution,
            &self.exploration_lite,
            &self.execution_lite,
        ] {
            if !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }
}
