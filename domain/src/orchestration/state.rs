//! Supervision state machine
//!
//! [`SupervisionState::next`] is total: every `(state, event)` pair maps to
//! exactly one state. Events that do not apply to the current state leave it
//! unchanged, and terminal states absorb every event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the foreman's supervision loop for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisionState {
    Received,
    Classifying,
    Answering,
    Planning,
    Dispatching,
    AwaitingResult,
    Reviewing,
    Retry,
    Handoff,
    Replan,
    Done,
    Exhausted,
    Cancelled,
}

/// What review concluded about a round's results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The request is satisfied
    Done,
    /// The same agent should try again
    Retry,
    /// A different agent type should take over
    Handoff,
    /// The plan no longer fits; plan again
    Replan,
}

/// Inputs that drive the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisionEvent {
    /// Request accepted for processing
    Accepted,
    /// Classification chose a direct answer
    RoutedToAnswer,
    /// Classification chose planning
    RoutedToPlan,
    /// Classification chose a single dispatch
    RoutedToDispatch,
    /// The direct answer is ready
    Answered,
    /// A plan (or the unplanned fallback) is ready to dispatch
    PlanReady,
    /// Agent runners were started
    Dispatched,
    /// Every dispatched runner produced a result
    ResultsReady,
    /// Review finished; `budget_left` is false once the round budget is spent
    Reviewed {
        outcome: ReviewOutcome,
        budget_left: bool,
    },
    /// Leave a Retry/Handoff/Replan state for the next round
    Resume,
    /// The caller cancelled the request
    Cancel,
}

impl SupervisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisionState::Received => "received",
            SupervisionState::Classifying => "classifying",
            SupervisionState::Answering => "answering",
            SupervisionState::Planning => "planning",
            SupervisionState::Dispatching => "dispatching",
            SupervisionState::AwaitingResult => "awaiting_result",
            SupervisionState::Reviewing => "reviewing",
            SupervisionState::Retry => "retry",
            SupervisionState::Handoff => "handoff",
            SupervisionState::Replan => "replan",
            SupervisionState::Done => "done",
            SupervisionState::Exhausted => "exhausted",
            SupervisionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SupervisionState::Done | SupervisionState::Exhausted | SupervisionState::Cancelled
        )
    }

    /// The transition function.
    pub fn next(self, event: SupervisionEvent) -> SupervisionState {
        use SupervisionEvent as E;
        use SupervisionState as S;

        if self.is_terminal() {
            return self;
        }

        match (self, event) {
            (_, E::Cancel) => S::Cancelled,

            (S::Received, E::Accepted) => S::Classifying,

            (S::Classifying, E::RoutedToAnswer) => S::Answering,
            (S::Classifying, E::RoutedToPlan) => S::Planning,
            (S::Classifying, E::RoutedToDispatch) => S::Dispatching,

            (S::Answering, E::Answered) => S::Done,

            (S::Planning, E::PlanReady) => S::Dispatching,

            (S::Dispatching, E::Dispatched) => S::AwaitingResult,

            (S::AwaitingResult, E::ResultsReady) => S::Reviewing,

            (S::Reviewing, E::Reviewed { outcome, budget_left }) => match (outcome, budget_left) {
                (ReviewOutcome::Done, _) => S::Done,
                (_, false) => S::Exhausted,
                (ReviewOutcome::Retry, true) => S::Retry,
                (ReviewOutcome::Handoff, true) => S::Handoff,
                (ReviewOutcome::Replan, true) => S::Replan,
            },

            (S::Retry | S::Handoff, E::Resume) => S::Dispatching,
            (S::Replan, E::Resume) => S::Planning,

            // Out-of-order events leave the state unchanged.
            (state, _) => state,
        }
    }
}

impl fmt::Display for SupervisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
