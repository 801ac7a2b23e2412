//! What the foreman hands back for one request

use super::complexity::Complexity;
use super::state::{ReviewOutcome, SupervisionState};
use crate::agent::entities::AgentResult;
use crate::plan::entities::Plan;
use serde::Serialize;

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The request was answered or the work was reviewed as done
    Completed,
    /// The round budget ran out; the response is the best partial result
    Incomplete,
    /// The caller cancelled the request
    Cancelled,
}

/// One Dispatch → Review cycle
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub results: Vec<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewOutcome>,
}

/// Non-fatal conditions met along the way
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Advisory {
    /// Both simple and complex cues matched; treated as moderate
    ClassificationAmbiguous,
    /// The plan was rejected and the request ran unplanned
    PlanRejected(String),
    /// A review call failed; the agents' own output was used
    ReviewFallback(String),
}

/// Final result of orchestrating one request
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationOutcome {
    pub status: OutcomeStatus,
    pub response: String,
    pub complexity: Complexity,
    pub final_state: SupervisionState,
    pub rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    pub history: Vec<RoundRecord>,
    pub advisories: Vec<Advisory>,
}

impl OrchestrationOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }

    /// Number of agent runner results across all rounds
    pub fn dispatch_count(&self) -> usize {
        self.history
            .iter()
            .flat_map(|r| r.results.iter())
            .filter(|r| r.status != crate::agent::entities::AgentRunStatus::Skipped)
            .count()
    }

    /// Response text with an explicit marker when not complete
    pub fn display_text(&self) -> String {
        match self.status {
            OutcomeStatus::Completed => self.response.clone(),
            OutcomeStatus::Incomplete => format!(
                "[incomplete after {} round(s)]\n{}",
                self.rounds, self.response
            ),
            OutcomeStatus::Cancelled => format!("[cancelled]\n{}", self.response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::agent_type::AgentType;

    fn outcome(status: OutcomeStatus) -> OrchestrationOutcome {
        OrchestrationOutcome {
            status,
            response: "partial".to_string(),
            complexity: Complexity::Moderate,
            final_state: SupervisionState::Exhausted,
            rounds: 3,
            plan: None,
            history: vec![RoundRecord {
                round: 1,
                results: vec![
                    AgentResult::completed(AgentType::Explorer, "a"),
                    AgentResult::skipped_by_dependency(AgentType::Executor, 2, 1),
                ],
                review: Some(ReviewOutcome::Retry),
            }],
            advisories: vec![Advisory::ClassificationAmbiguous],
        }
    }

    #[test]
    fn test_incomplete_marker() {
        let text = outcome(OutcomeStatus::Incomplete).display_text();
        assert!(text.starts_with("[incomplete after 3 round(s)]"));
        assert!(text.ends_with("partial"));
        assert_eq!(outcome(OutcomeStatus::Completed).display_text(), "partial");
    }

    #[test]
    fn test_dispatch_count_ignores_skipped() {
        assert_eq!(outcome(OutcomeStatus::Completed).dispatch_count(), 1);
    }

    #[test]
    fn test_serializes_advisories() {
        let json = serde_json::to_value(outcome(OutcomeStatus::Incomplete)).unwrap();
        assert_eq!(json["status"], "incomplete");
        assert_eq!(json["advisories"][0]["kind"], "classification_ambiguous");
    }
}
