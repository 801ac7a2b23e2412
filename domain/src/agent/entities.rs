//! Agent domain entities: dispatched tasks and their results

use super::agent_type::AgentType;
use crate::core::model::{Model, ModelTier};
use serde::{Deserialize, Serialize};

/// A unit of work handed to one Agent Runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// What the agent should do
    pub task: String,
    /// Which sub-agent handles it
    pub agent_type: AgentType,
    /// Resolved tier for this dispatch
    pub tier: ModelTier,
    /// Concrete model the tier resolved to
    pub model: Model,
    /// Outputs of earlier steps and rounds, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    /// Plan step this task belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_num: Option<u32>,
}

impl AgentTask {
    pub fn new(
        task: impl Into<String>,
        agent_type: AgentType,
        tier: ModelTier,
        model: Model,
    ) -> Self {
        Self {
            task: task.into(),
            agent_type,
            tier,
            model,
            context: Vec::new(),
            step_num: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_contexts(mut self, contexts: impl IntoIterator<Item = String>) -> Self {
        self.context.extend(contexts);
        self
    }

    pub fn with_step(mut self, step_num: u32) -> Self {
        self.step_num = Some(step_num);
        self
    }
}

/// How an Agent Runner invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    /// The agent produced a final answer
    Completed,
    /// The agent ran but did not reach an answer
    Failed,
    /// Aborted by the caller
    Cancelled,
    /// Aborted by the per-agent timeout
    TimedOut,
    /// Not dispatched because a dependency failed
    Skipped,
    /// The regulator's admission queue was full
    AdmissionRejected,
}

impl AgentRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRunStatus::Completed => "completed",
            AgentRunStatus::Failed => "failed",
            AgentRunStatus::Cancelled => "cancelled",
            AgentRunStatus::TimedOut => "timed_out",
            AgentRunStatus::Skipped => "skipped",
            AgentRunStatus::AdmissionRejected => "admission_rejected",
        }
    }

    /// Whether re-dispatching the same task could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentRunStatus::Failed | AgentRunStatus::TimedOut | AgentRunStatus::AdmissionRejected
        )
    }
}

impl std::fmt::Display for AgentRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one Agent Runner invocation.
///
/// `details` is passed through to the caller untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_type: AgentType,
    pub success: bool,
    pub summary: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub actions_taken: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: AgentRunStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_num: Option<u32>,
}

impl AgentResult {
    pub fn completed(agent_type: AgentType, summary: impl Into<String>) -> Self {
        Self {
            agent_type,
            success: true,
            summary: summary.into(),
            details: serde_json::Value::Null,
            actions_taken: Vec::new(),
            error: None,
            status: AgentRunStatus::Completed,
            duration_ms: 0,
            step_num: None,
        }
    }

    pub fn failed(agent_type: AgentType, error: impl Into<String>) -> Self {
        Self::unsuccessful(agent_type, AgentRunStatus::Failed, error)
    }

    pub fn cancelled(agent_type: AgentType) -> Self {
        Self::unsuccessful(agent_type, AgentRunStatus::Cancelled, "Agent run cancelled")
    }

    pub fn timed_out(agent_type: AgentType, after_secs: u64) -> Self {
        Self::unsuccessful(
            agent_type,
            AgentRunStatus::TimedOut,
            format!("Agent timed out after {}s", after_secs),
        )
    }

    pub fn admission_rejected(agent_type: AgentType, reason: impl Into<String>) -> Self {
        Self::unsuccessful(agent_type, AgentRunStatus::AdmissionRejected, reason)
    }

    /// Result for a plan step whose dependency did not succeed
    pub fn skipped_by_dependency(agent_type: AgentType, step_num: u32, dependency: u32) -> Self {
        Self::unsuccessful(
            agent_type,
            AgentRunStatus::Skipped,
            format!(
                "Step {} skipped: dependency step {} did not succeed",
                step_num, dependency
            ),
        )
        .with_step(step_num)
    }

    fn unsuccessful(agent_type: AgentType, status: AgentRunStatus, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            agent_type,
            success: false,
            summary: error.clone(),
            details: serde_json::Value::Null,
            actions_taken: Vec::new(),
            error: Some(error),
            status,
            duration_ms: 0,
            step_num: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions_taken = actions;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_step(mut self, step_num: u32) -> Self {
        self.step_num = Some(step_num);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == AgentRunStatus::Cancelled
    }

    /// Text handed to review: the summary, or the error marked as such.
    pub fn review_text(&self) -> String {
        if self.success {
            self.summary.clone()
        } else {
            format!(
                "AGENT ERROR: {}",
                self.error.as_deref().unwrap_or(&self.summary)
            )
        }
    }
}
