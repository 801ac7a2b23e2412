//! Review decision rules
//!
//! Turns the foreman's review reply (and the round's results) into one of
//! the four review outcomes. Retries are bounded per step; once exhausted,
//! a retry request becomes a handoff to another agent type.

use super::spawn::FollowUp;
use super::state::ReviewOutcome;
use crate::agent::agent_type::AgentType;

/// Facts about the round being reviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewContext {
    /// Every result in the round succeeded
    pub all_succeeded: bool,
    /// Agent type of an unplanned dispatch; None for plan rounds
    pub last_agent: Option<AgentType>,
    /// At least one failed step still has retries left
    pub retries_left: bool,
}

/// Next move after review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Done { summary: String },
    /// Re-dispatch the same work; `task` replaces the task text if given
    Retry { task: Option<String> },
    /// Dispatch `task` (or the previous task) to a different agent type
    Handoff {
        agent_type: AgentType,
        task: Option<String>,
    },
    Replan { task: Option<String> },
}

impl ReviewDecision {
    pub fn outcome(&self) -> ReviewOutcome {
        match self {
            ReviewDecision::Done { .. } => ReviewOutcome::Done,
            ReviewDecision::Retry { .. } => ReviewOutcome::Retry,
            ReviewDecision::Handoff { .. } => ReviewOutcome::Handoff,
            ReviewDecision::Replan { .. } => ReviewOutcome::Replan,
        }
    }
}

fn exhausted_retry(context: &ReviewContext, task: Option<String>) -> ReviewDecision {
    let from = context.last_agent.unwrap_or(AgentType::Executor);
    ReviewDecision::Handoff {
        agent_type: from.handoff_target(),
        task,
    }
}

/// Decide the review outcome.
///
/// | follow-up             | results      | decision                                |
/// |-----------------------|--------------|-----------------------------------------|
/// | planner               | any          | Replan                                  |
/// | same agent as before  | any          | Retry, or Handoff when retries are spent |
/// | other agent           | any          | Handoff to that agent                   |
/// | none                  | all ok       | Done with the review text               |
/// | none                  | some failed  | Retry, or Handoff when retries are spent |
pub fn decide_review(
    follow_up: Option<FollowUp>,
    review_text: &str,
    context: &ReviewContext,
) -> ReviewDecision {
    match follow_up {
        Some(FollowUp {
            agent_type: AgentType::Planner,
            task,
        }) => ReviewDecision::Replan { task: Some(task) },
        Some(FollowUp { agent_type, task }) if context.last_agent == Some(agent_type) => {
            if context.retries_left {
                ReviewDecision::Retry { task: Some(task) }
            } else {
                exhausted_retry(context, Some(task))
            }
        }
        Some(FollowUp { agent_type, task }) => ReviewDecision::Handoff {
            agent_type,
            task: Some(task),
        },
        None if context.all_succeeded => ReviewDecision::Done {
            summary: review_text.trim().to_string(),
        },
        None if context.retries_left => ReviewDecision::Retry { task: None },
        None => exhausted_retry(context, None),
    }
}
